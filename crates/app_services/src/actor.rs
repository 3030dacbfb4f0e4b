//! Authenticated caller and role checks

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::CompanyId;
use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Fee payer, bound to one company
    Business,
    EcoOperator,
    Employee,
    /// Reviewer with ledger administration rights
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Business => "business",
            Role::EcoOperator => "eco_operator",
            Role::Employee => "employee",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "business" => Ok(Role::Business),
            "eco_operator" => Ok(Role::EcoOperator),
            "employee" => Ok(Role::Employee),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// The user a service call is made on behalf of
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
    pub company_id: Option<CompanyId>,
}

impl Actor {
    pub fn payer(user_id: impl Into<String>, company_id: CompanyId) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Business,
            company_id: Some(company_id),
        }
    }

    pub fn staff(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            company_id: None,
        }
    }

    pub fn is_reviewer(&self) -> bool {
        matches!(self.role, Role::EcoOperator | Role::Employee | Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Company a listing is restricted to; `None` for staff
    ///
    /// A payer without a company is refused rather than given an unscoped view.
    pub fn scope(&self) -> Result<Option<CompanyId>, ServiceError> {
        if self.is_reviewer() {
            return Ok(None);
        }
        self.payer_company().map(Some)
    }

    /// The payer's own company
    pub fn payer_company(&self) -> Result<CompanyId, ServiceError> {
        match (self.role, self.company_id) {
            (Role::Business, Some(company_id)) => Ok(company_id),
            (Role::Business, None) => Err(ServiceError::forbidden("user is not linked to a company")),
            _ => Err(ServiceError::forbidden("only payers can perform this action")),
        }
    }

    pub fn ensure_reviewer(&self) -> Result<(), ServiceError> {
        if self.is_reviewer() {
            Ok(())
        } else {
            Err(ServiceError::forbidden("reviewer role required"))
        }
    }

    pub fn ensure_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::forbidden("admin role required"))
        }
    }

    /// Payers may act only on their own company
    pub fn ensure_owner(&self, company_id: CompanyId) -> Result<(), ServiceError> {
        if self.payer_company()? == company_id {
            Ok(())
        } else {
            Err(ServiceError::forbidden("no access to another company's documents"))
        }
    }

    /// Staff read everything, payers only their own company
    pub fn ensure_can_read(&self, company_id: CompanyId) -> Result<(), ServiceError> {
        if self.is_reviewer() {
            return Ok(());
        }
        self.ensure_owner(company_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payer_scope() {
        let company = CompanyId::new();
        let payer = Actor::payer("u1", company);
        assert_eq!(payer.scope(), Ok(Some(company)));
        assert!(payer.ensure_owner(company).is_ok());
        assert!(payer.ensure_can_read(CompanyId::new()).is_err());
        assert!(payer.ensure_reviewer().is_err());
    }

    #[test]
    fn test_staff_roles() {
        let operator = Actor::staff("op", Role::EcoOperator);
        assert!(operator.ensure_reviewer().is_ok());
        assert!(operator.ensure_admin().is_err());
        assert!(operator.payer_company().is_err());
        assert_eq!(operator.scope(), Ok(None));
        assert!(Actor { user_id: "x".into(), role: Role::Business, company_id: None }.scope().is_err());
        assert!(Actor::staff("root", Role::Admin).ensure_admin().is_ok());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("ECO_OPERATOR".parse::<Role>().unwrap(), Role::EcoOperator);
        assert!("auditor".parse::<Role>().is_err());
    }
}
