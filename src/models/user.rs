use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    /// Account category
    pub enum UserType {
        Farmer => "farmer",
        Investor => "investor",
        Admin => "admin",
    }
}

impl Default for UserType {
    fn default() -> Self {
        UserType::Farmer
    }
}

/// A user account (credentials live with the upstream identity provider)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[sqlx(try_from = "String")]
    pub user_type: UserType,
    pub phone_number: String,
    pub address: String,
    pub bio: String,
    pub is_verified: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// "First Last", the first name alone, or the username as a fallback
    pub fn full_name(&self) -> String {
        match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (false, false) => format!("{} {}", self.first_name, self.last_name),
            (false, true) => self.first_name.clone(),
            _ => self.username.clone(),
        }
    }

    /// Two-letter avatar initials
    pub fn initials(&self) -> String {
        let initials: String = if !self.first_name.is_empty() && !self.last_name.is_empty() {
            self.first_name
                .chars()
                .take(1)
                .chain(self.last_name.chars().take(1))
                .collect()
        } else if !self.first_name.is_empty() {
            self.first_name.chars().take(2).collect()
        } else {
            self.username.chars().take(2).collect()
        };
        initials.to_uppercase()
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct NewUser {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub user_type: UserType,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub bio: String,
}

/// Profile edit; username and join date are read-only
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
}

impl UserUpdate {
    pub fn apply(&self, user: &mut User) {
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(first_name) = &self.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            user.last_name = last_name.clone();
        }
        if let Some(phone) = &self.phone_number {
            user.phone_number = phone.clone();
        }
        if let Some(address) = &self.address {
            user.address = address.clone();
        }
        if let Some(bio) = &self.bio {
            user.bio = bio.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str, first: &str, last: &str) -> User {
        User {
            id: 1,
            username: username.to_string(),
            email: String::new(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            user_type: UserType::Farmer,
            phone_number: String::new(),
            address: String::new(),
            bio: String::new(),
            is_verified: false,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn test_full_name_fallbacks() {
        assert_eq!(user("asha", "Asha", "Patil").full_name(), "Asha Patil");
        assert_eq!(user("asha", "Asha", "").full_name(), "Asha");
        assert_eq!(user("asha", "", "Patil").full_name(), "asha");
    }

    #[test]
    fn test_initials_fallbacks() {
        assert_eq!(user("asha", "asha", "patil").initials(), "AP");
        assert_eq!(user("asha", "ravi", "").initials(), "RA");
        assert_eq!(user("kiran", "", "").initials(), "KI");
    }

    #[test]
    fn test_update_leaves_absent_fields() {
        let mut u = user("asha", "Asha", "Patil");
        UserUpdate {
            bio: Some("Grows sugarcane".to_string()),
            ..UserUpdate::default()
        }
        .apply(&mut u);

        assert_eq!(u.bio, "Grows sugarcane");
        assert_eq!(u.first_name, "Asha");
    }
}
