use serde::{Deserialize, Serialize};
use ulid::Ulid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    CompanyAdmin,
    AgencyManager,
    Agent,
}

/// Caller identity passed to every engine query.
///
/// `agency_ids` is the set of agencies the caller may plan for; for a company
/// admin the caller fills it with every agency of the company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub role: Role,
    pub company_id: Option<Ulid>,
    pub agency_ids: Vec<Ulid>,
}

impl Principal {
    pub fn super_admin() -> Self {
        Self {
            role: Role::SuperAdmin,
            company_id: None,
            agency_ids: Vec::new(),
        }
    }

    pub fn for_agencies(role: Role, company_id: Option<Ulid>, agency_ids: Vec<Ulid>) -> Self {
        Self {
            role,
            company_id,
            agency_ids,
        }
    }

    pub fn can_access(&self, agency_id: &Ulid) -> bool {
        match self.role {
            Role::SuperAdmin => true,
            Role::CompanyAdmin | Role::AgencyManager | Role::Agent => {
                self.agency_ids.contains(agency_id)
            }
        }
    }
}
