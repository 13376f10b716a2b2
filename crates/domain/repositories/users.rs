use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::provisioning::UserCustomerLink;

#[automock]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Merge-writes the link into the user record, creating it if needed and
    /// leaving unrelated fields untouched.
    async fn link_customer(&self, user_id: &str, link: UserCustomerLink) -> Result<()>;
}
