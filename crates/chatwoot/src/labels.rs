//! Endpoints de labels (tags) de conversa
//!
//! `POST /labels` substitui o conjunto inteiro; quem chama precisa sempre
//! calcular o conjunto final desejado, nunca um delta.

use crate::client::{AuthToken, ChatwootClient};
use crate::error::Result;
use crate::types::Label;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct LabelsPage {
    #[serde(default)]
    payload: Vec<Label>,
}

impl ChatwootClient {
    /// `GET /conversations/{id}/labels`
    pub async fn get_labels(&self, conversation_id: u64) -> Result<Vec<String>> {
        let page: LabelsPage = self
            .get_json(&format!("/conversations/{}/labels", conversation_id))
            .await?;
        Ok(page.payload.into_iter().filter_map(Label::into_title).collect())
    }

    /// `POST /conversations/{id}/labels` com o conjunto completo
    pub async fn set_labels(&self, conversation_id: u64, labels: &[String]) -> Result<()> {
        let body = json!({ "labels": labels });
        let _: Value = self
            .post_json(
                &format!("/conversations/{}/labels", conversation_id),
                &body,
                AuthToken::Admin,
            )
            .await?;
        Ok(())
    }

    /// Acrescenta labels preservando as existentes (leitura + união + POST)
    pub async fn add_labels(&self, conversation_id: u64, labels: &[String]) -> Result<Vec<String>> {
        let mut current = self.get_labels(conversation_id).await?;
        for label in labels {
            if !current.contains(label) {
                current.push(label.clone());
            }
        }
        self.set_labels(conversation_id, &current).await?;
        Ok(current)
    }

    /// `DELETE /conversations/{id}/labels` com `{ "labels": [label] }`
    pub async fn remove_label(&self, conversation_id: u64, label: &str) -> Result<()> {
        let body = json!({ "labels": [label] });
        self.delete_with_body(&format!("/conversations/{}/labels", conversation_id), &body)
            .await?;
        Ok(())
    }
}
