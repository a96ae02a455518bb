//! Staff roster
//!
//! 员工名单来自 `STAFF_ROSTER_PATH` 指向的 JSON 文件：
//!
//! ```json
//! [{ "id": 1, "phone": "600111222", "name": "Marta", "role": "teller", "otp_hash": "$argon2id$..." }]
//! ```
//!
//! 运行期只读；修改名单需要重启服务。

use crate::ledger::codes::normalize_phone;
use shared::models::StaffMember;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Failed to read roster file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid roster file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid roster entry '{name}': {reason}")]
    InvalidEntry { name: String, reason: String },
}

/// Verify an one-time code against its argon2 hash
pub fn verify_otp(otp: &str, otp_hash: &str) -> Result<bool, argon2::password_hash::Error> {
    use argon2::{
        Argon2,
        password_hash::{PasswordHash, PasswordVerifier},
    };

    let parsed_hash = PasswordHash::new(otp_hash)?;
    Ok(Argon2::default()
        .verify_password(otp.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hash an one-time code using argon2 (used to provision roster files)
pub fn hash_otp(otp: &str) -> Result<String, argon2::password_hash::Error> {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
    };

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(otp.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// In-memory staff roster keyed by normalized phone
#[derive(Debug, Clone, Default)]
pub struct StaffRoster {
    members: HashMap<String, StaffMember>,
}

impl StaffRoster {
    /// Load the roster file; a missing file yields an empty roster
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RosterError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Staff roster file not found, no staff member can log in"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| RosterError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let members: Vec<StaffMember> = serde_json::from_str(&content)?;
        let roster = Self::from_members(members)?;

        tracing::info!(
            path = %path.display(),
            members = roster.len(),
            "Staff roster loaded"
        );
        Ok(roster)
    }

    /// Build a roster from entries, normalizing phones
    pub fn from_members(members: Vec<StaffMember>) -> Result<Self, RosterError> {
        let mut map = HashMap::with_capacity(members.len());
        for mut member in members {
            let phone = normalize_phone(&member.phone).map_err(|e| RosterError::InvalidEntry {
                name: member.name.clone(),
                reason: e.to_string(),
            })?;
            if map.contains_key(&phone) {
                return Err(RosterError::InvalidEntry {
                    name: member.name.clone(),
                    reason: format!("duplicate phone {}", phone),
                });
            }
            member.phone = phone.clone();
            map.insert(phone, member);
        }
        Ok(Self { members: map })
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Active member by staff id
    pub fn find_active(&self, staff_id: i64) -> Option<&StaffMember> {
        self.members
            .values()
            .find(|m| m.id == staff_id && m.is_active)
    }

    /// Check phone + one-time code
    ///
    /// Returns `None` for unknown phones, inactive members and wrong codes
    /// alike; callers must not tell them apart.
    pub fn authenticate(&self, phone: &str, otp: &str) -> Option<StaffMember> {
        let phone = normalize_phone(phone).ok()?;
        let member = self.members.get(&phone)?;
        if !member.is_active {
            return None;
        }
        match verify_otp(otp, &member.otp_hash) {
            Ok(true) => Some(member.clone()),
            Ok(false) => None,
            Err(e) => {
                tracing::error!(staff_id = member.id, error = %e, "Malformed otp hash in roster");
                None
            }
        }
    }
}
