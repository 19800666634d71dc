use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::instrument;

use demeter_analytics::DEFAULT_EXPIRY_WINDOW_DAYS;
use demeter_auth::Principal;
use demeter_chatbot::{
    AssistantContext, ChatMessage, ChatSession, ChatSessionId, CreateChatSessionRequest, MessageRole,
    PostMessageRequest, SALES_WINDOW_DAYS, UpdateChatSessionRequest, reply,
};
use demeter_core::{Page, PageRequest, Record};

use super::analytics::{load_expiring, load_sales, load_stock};
use super::{ServiceError, ServiceResult};
use crate::store::{Filter, Store, Tx};

/// A posted message and the assistant's answer to it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatExchange {
    pub user_message: ChatMessage,
    pub assistant_message: ChatMessage,
}

/// Per-user chat sessions with the inventory assistant.
///
/// Sessions are private: another user's session reads as not found.
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn Store>,
}

async fn owned_session(tx: &mut Tx, principal: &Principal, id: ChatSessionId) -> ServiceResult<ChatSession> {
    match tx.get::<ChatSession>(id).await? {
        Some(session) if session.is_owned_by(&principal.user_id) => Ok(session),
        _ => Err(ServiceError::not_found(ChatSession::ENTITY, id)),
    }
}

async fn snapshot(tx: &mut Tx) -> ServiceResult<AssistantContext> {
    let now = Utc::now();
    Ok(AssistantContext {
        stock: load_stock(tx, now).await?,
        expiring: load_expiring(tx, now, DEFAULT_EXPIRY_WINDOW_DAYS).await?,
        expiry_window_days: DEFAULT_EXPIRY_WINDOW_DAYS,
        sales: load_sales(tx, Some(now - Duration::days(SALES_WINDOW_DAYS)), None).await?,
    })
}

impl ChatService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, principal, req), fields(tenant_id = %principal.tenant_id), err)]
    pub async fn create(&self, principal: &Principal, req: CreateChatSessionRequest) -> ServiceResult<ChatSession> {
        let mut tx = self.store.begin(&principal.tenant_id).await?;
        let session = ChatSession::create(principal.user_id.clone(), req, Utc::now())?;
        tx.insert(&session).await?;
        tx.commit().await?;
        Ok(session)
    }

    pub async fn list_own(&self, principal: &Principal, page: PageRequest) -> ServiceResult<Page<ChatSession>> {
        let mut tx = self.store.begin(&principal.tenant_id).await?;
        Ok(tx
            .page::<ChatSession>(vec![Filter::eq("userId", &principal.user_id)], page)
            .await?)
    }

    pub async fn get(&self, principal: &Principal, id: ChatSessionId) -> ServiceResult<ChatSession> {
        let mut tx = self.store.begin(&principal.tenant_id).await?;
        owned_session(&mut tx, principal, id).await
    }

    #[instrument(skip(self, principal, req), fields(tenant_id = %principal.tenant_id), err)]
    pub async fn rename(
        &self,
        principal: &Principal,
        id: ChatSessionId,
        req: UpdateChatSessionRequest,
    ) -> ServiceResult<ChatSession> {
        let mut tx = self.store.begin(&principal.tenant_id).await?;
        let mut session = owned_session(&mut tx, principal, id).await?;
        session.apply_update(req, Utc::now())?;
        tx.update(&session).await?;
        tx.commit().await?;
        Ok(session)
    }

    #[instrument(skip(self, principal), fields(tenant_id = %principal.tenant_id), err)]
    pub async fn delete(&self, principal: &Principal, id: ChatSessionId) -> ServiceResult<()> {
        let mut tx = self.store.begin(&principal.tenant_id).await?;
        owned_session(&mut tx, principal, id).await?;
        let messages = tx
            .find_all::<ChatMessage>(vec![Filter::eq("sessionId", id)])
            .await?;
        for message in &messages {
            tx.delete::<ChatMessage>(message.id).await?;
        }
        tx.delete::<ChatSession>(id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Messages of a session, oldest first.
    pub async fn messages(&self, principal: &Principal, id: ChatSessionId) -> ServiceResult<Vec<ChatMessage>> {
        let mut tx = self.store.begin(&principal.tenant_id).await?;
        owned_session(&mut tx, principal, id).await?;
        Ok(tx
            .find_all::<ChatMessage>(vec![Filter::eq("sessionId", id)])
            .await?)
    }

    /// Store the user's message and the assistant's reply in one transaction.
    ///
    /// The reply is computed from analytics read in the same transaction.
    #[instrument(skip(self, principal, req), fields(tenant_id = %principal.tenant_id), err)]
    pub async fn post(
        &self,
        principal: &Principal,
        id: ChatSessionId,
        req: PostMessageRequest,
    ) -> ServiceResult<ChatExchange> {
        let mut tx = self.store.begin(&principal.tenant_id).await?;
        let mut session = owned_session(&mut tx, principal, id).await?;
        let user_message = session.add_message(MessageRole::User, &req.content, Utc::now())?;

        let context = snapshot(&mut tx).await?;
        let answer = reply(&context, &user_message.content);
        let assistant_message = session.add_message(MessageRole::Assistant, &answer, Utc::now())?;

        tx.insert(&user_message).await?;
        tx.insert(&assistant_message).await?;
        tx.update(&session).await?;
        tx.commit().await?;
        Ok(ChatExchange {
            user_message,
            assistant_message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{store, tenant};
    use crate::services::{ProductService, StockBatchService};
    use demeter_auth::Role;
    use demeter_inventory::CreateStockBatchRequest;
    use demeter_products::CreateProductRequest;
    use rust_decimal::Decimal;

    fn principal(user: &str) -> Principal {
        Principal {
            user_id: user.into(),
            email: None,
            name: None,
            tenant_id: tenant("tenant-alpha"),
            roles: vec![Role::Worker],
        }
    }

    #[tokio::test]
    async fn post_answers_from_live_stock() {
        let shared = store();
        let ana = principal("ana");
        let product = ProductService::new(shared.clone())
            .create(
                &ana.tenant_id,
                CreateProductRequest {
                    sku: "ALOE".into(),
                    name: "Aloe vera".into(),
                    description: None,
                    category_id: None,
                    state: None,
                    custom_attributes: None,
                },
            )
            .await
            .unwrap();
        StockBatchService::new(shared.clone())
            .create(
                &ana.tenant_id,
                CreateStockBatchRequest {
                    product_id: product.id,
                    batch_code: "AL-1".into(),
                    quantity: Decimal::from(42),
                    unit: "pots".into(),
                    warehouse_id: None,
                    bin_id: None,
                    custom_attributes: None,
                    entry_date: None,
                    expiry_date: None,
                },
            )
            .await
            .unwrap();

        let chat = ChatService::new(shared);
        let session = chat.create(&ana, CreateChatSessionRequest::default()).await.unwrap();
        let exchange = chat
            .post(
                &ana,
                session.id,
                PostMessageRequest {
                    content: "How much stock do we have?".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(exchange.user_message.role, MessageRole::User);
        assert_eq!(exchange.assistant_message.role, MessageRole::Assistant);
        assert!(exchange.assistant_message.content.contains("42"));

        let messages = chat.messages(&ana, session.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, exchange.user_message.id);
        let stored = chat.get(&ana, session.id).await.unwrap();
        assert_eq!(stored.message_count, 2);
        assert_eq!(stored.title, "How much stock do we have?");
    }

    #[tokio::test]
    async fn sessions_are_private() {
        let chat = ChatService::new(store());
        let ana = principal("ana");
        let bob = principal("bob");
        let session = chat.create(&ana, CreateChatSessionRequest::default()).await.unwrap();

        assert!(matches!(chat.get(&bob, session.id).await, Err(ServiceError::NotFound { .. })));
        assert_eq!(chat.list_own(&bob, PageRequest::default()).await.unwrap().total_elements, 0);
        assert_eq!(chat.list_own(&ana, PageRequest::default()).await.unwrap().total_elements, 1);
        assert!(chat.delete(&bob, session.id).await.is_err());
    }

    #[tokio::test]
    async fn delete_removes_messages() {
        let shared = store();
        let chat = ChatService::new(shared.clone());
        let ana = principal("ana");
        let session = chat.create(&ana, CreateChatSessionRequest::default()).await.unwrap();
        chat.post(&ana, session.id, PostMessageRequest { content: "help".into() })
            .await
            .unwrap();
        chat.delete(&ana, session.id).await.unwrap();

        let mut tx = shared.begin(&ana.tenant_id).await.unwrap();
        let left = tx.count::<ChatMessage>(&[]).await.unwrap();
        assert_eq!(left, 0);
    }
}
