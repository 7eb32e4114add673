//! Endpoints de contatos

use crate::client::{AuthToken, ChatwootClient};
use crate::error::Result;
use crate::types::contact::ContactEnvelope;
use crate::types::{Contact, ContactUpdate, NewContact};
use serde_json::Value;

impl ChatwootClient {
    /// `GET /contacts/{id}`
    pub async fn get_contact(&self, contact_id: u64) -> Result<Contact> {
        let envelope: ContactEnvelope = self.get_json(&format!("/contacts/{}", contact_id)).await?;
        Ok(envelope.into_contact())
    }

    /// `POST /contacts`
    pub async fn create_contact(&self, contact: &NewContact) -> Result<Contact> {
        let body = serde_json::to_value(contact)?;
        let envelope: ContactEnvelope = self.post_json("/contacts", &body, AuthToken::Admin).await?;
        let contact = envelope.into_contact();
        tracing::info!("👤 Contato {} criado", contact.id);
        Ok(contact)
    }

    /// `PUT /contacts/{id}`
    pub async fn update_contact(&self, contact_id: u64, update: &ContactUpdate) -> Result<()> {
        let body = serde_json::to_value(update)?;
        let _: Value = self.put_json(&format!("/contacts/{}", contact_id), &body).await?;
        Ok(())
    }
}
