use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Identity snapshot of a trip-operating company. Owned by the external
/// identity service; only the linkage fields matter here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Identity snapshot of a user profile. A profile may carry a company link
/// established during operator onboarding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub display_name: String,
    pub company_id: Option<Uuid>,
}

/// Resolves which company an actor operates for.
///
/// Company linkage can be established through two onboarding paths: owning
/// or creating the company record, or carrying a company link on the user
/// profile. Both paths are normalized into one authoritative table at
/// registration time, so every authorization check is a single lookup
/// instead of two ad-hoc queries.
#[async_trait]
pub trait OperatorDirectory: Send + Sync {
    async fn company_for(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Uuid>, Box<dyn std::error::Error + Send + Sync>>;

    async fn is_operator_for(
        &self,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// The principal to notify for a company (its registered owner).
    async fn operator_for_company(
        &self,
        company_id: Uuid,
    ) -> Result<Option<Uuid>, Box<dyn std::error::Error + Send + Sync>>;
}

/// In-memory linkage table.
#[derive(Default)]
pub struct InMemoryDirectory {
    links: RwLock<HashMap<Uuid, BTreeSet<Uuid>>>,
    owners: RwLock<HashMap<Uuid, Uuid>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the ownership/creation linkage path.
    pub async fn register_company(&self, company: &Company) {
        let mut links = self.links.write().await;
        links
            .entry(company.owner_id)
            .or_default()
            .insert(company.id);
        links
            .entry(company.created_by)
            .or_default()
            .insert(company.id);
        drop(links);
        self.owners
            .write()
            .await
            .insert(company.id, company.owner_id);
        tracing::info!(
            company_id = %company.id,
            owner_id = %company.owner_id,
            "Registered company linkage"
        );
    }

    /// Record the profile-carried linkage path.
    pub async fn register_profile(&self, profile: &UserProfile) {
        if let Some(company_id) = profile.company_id {
            let mut links = self.links.write().await;
            links.entry(profile.id).or_default().insert(company_id);
            tracing::info!(
                user_id = %profile.id,
                company_id = %company_id,
                "Registered profile linkage"
            );
        }
    }
}

#[async_trait]
impl OperatorDirectory for InMemoryDirectory {
    async fn company_for(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Uuid>, Box<dyn std::error::Error + Send + Sync>> {
        let links = self.links.read().await;
        Ok(links
            .get(&user_id)
            .and_then(|set| set.iter().next().copied()))
    }

    async fn is_operator_for(
        &self,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let links = self.links.read().await;
        Ok(links
            .get(&user_id)
            .map(|set| set.contains(&company_id))
            .unwrap_or(false))
    }

    async fn operator_for_company(
        &self,
        company_id: Uuid,
    ) -> Result<Option<Uuid>, Box<dyn std::error::Error + Send + Sync>> {
        let owners = self.owners.read().await;
        Ok(owners.get(&company_id).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(owner: Uuid, creator: Uuid) -> Company {
        Company {
            id: Uuid::new_v4(),
            name: "Najd Tours".to_string(),
            owner_id: owner,
            created_by: creator,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn ownership_path_links_owner_and_creator() {
        let directory = InMemoryDirectory::new();
        let owner = Uuid::new_v4();
        let creator = Uuid::new_v4();
        let c = company(owner, creator);
        directory.register_company(&c).await;

        assert!(directory.is_operator_for(owner, c.id).await.unwrap());
        assert!(directory.is_operator_for(creator, c.id).await.unwrap());
        assert_eq!(directory.company_for(owner).await.unwrap(), Some(c.id));
        assert_eq!(
            directory.operator_for_company(c.id).await.unwrap(),
            Some(owner)
        );
    }

    #[tokio::test]
    async fn profile_path_links_staff_member() {
        let directory = InMemoryDirectory::new();
        let owner = Uuid::new_v4();
        let c = company(owner, owner);
        directory.register_company(&c).await;

        let staff = UserProfile {
            id: Uuid::new_v4(),
            display_name: "Moderator".to_string(),
            company_id: Some(c.id),
        };
        directory.register_profile(&staff).await;

        assert!(directory.is_operator_for(staff.id, c.id).await.unwrap());
    }

    #[tokio::test]
    async fn unlinked_user_is_not_an_operator() {
        let directory = InMemoryDirectory::new();
        let c = company(Uuid::new_v4(), Uuid::new_v4());
        directory.register_company(&c).await;

        let stranger = Uuid::new_v4();
        assert!(!directory.is_operator_for(stranger, c.id).await.unwrap());
        assert_eq!(directory.company_for(stranger).await.unwrap(), None);
    }
}
