use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Customer,
    Employee,
    Manager,
}

impl Role {
    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Employee | Self::Manager)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub expiration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

/// The signed-in user, identified by email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<Role>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.roles.iter().any(|r| roles.contains(r))
    }

    pub fn is_staff(&self) -> bool {
        self.roles.iter().any(Role::is_staff)
    }
}

impl From<&AuthResponse> for User {
    /// Role names the client does not know are dropped.
    fn from(response: &AuthResponse) -> Self {
        let roles = response
            .roles
            .iter()
            .filter_map(|r| match r.as_str() {
                "Customer" => Some(Role::Customer),
                "Employee" => Some(Role::Employee),
                "Manager" => Some(Role::Manager),
                _ => None,
            })
            .collect();
        Self {
            email: response.email.clone(),
            first_name: response.first_name.clone(),
            last_name: response.last_name.clone(),
            roles,
        }
    }
}
