//! Estado efêmero por conversa
//!
//! Locks de envio/resposta, contadores da base de conhecimento, timer de
//! auto-close e registro de deduplicação ficam atrás de
//! [`ConversationStateStore`]. A implementação em memória atende um processo
//! único; múltiplas instâncias exigem um store externo com set-if-absent
//! atômico e TTL.
//!
//! Locks são leases com expiração explícita, verificada na leitura: um lease
//! está livre quando `now >= expires_at`. Quem encontra o lease ocupado pula,
//! nunca espera. O registro de deduplicação expira do mesmo jeito.
//!
//! O estado da conversa (contadores, flags) é descartado com [`forget`] quando
//! ela é resolvida ou reaberta; só o timer pendente sobrevive, e a entrada some
//! quando fica vazia.
//!
//! [`forget`]: ConversationStateStore::forget

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

/// Chave de um lease
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockKey {
    /// Envio de mensagem na conversa
    Send(u64),
    /// Resposta de uma entrada da KB na conversa
    Response(u64, String),
}

impl LockKey {
    pub fn conversation_id(&self) -> u64 {
        match self {
            LockKey::Send(id) | LockKey::Response(id, _) => *id,
        }
    }
}

/// Timer de auto-close pendente
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTicket {
    pub id: u64,
    pub deadline: Instant,
}

#[async_trait]
pub trait ConversationStateStore: Send + Sync {
    // ===== leases =====

    /// Set-if-absent com expiração; `true` se o lease foi obtido
    async fn try_acquire(&self, key: &LockKey, ttl: Duration) -> bool;

    async fn release(&self, key: &LockKey);

    async fn is_locked(&self, key: &LockKey) -> bool;

    // ===== contadores da KB =====

    /// `None` quando a conversa ainda não foi carregada neste processo
    async fn counters(&self, conversation_id: u64) -> Option<BTreeMap<String, u32>>;

    async fn set_counters(&self, conversation_id: u64, counters: BTreeMap<String, u32>);

    /// Incrementa e devolve o mapa completo (para persistir no helpdesk)
    async fn increment_counter(&self, conversation_id: u64, control_tag: &str) -> BTreeMap<String, u32>;

    // ===== auto-close =====

    /// Registra um timer se não houver outro pendente
    async fn try_set_timer(&self, conversation_id: u64, deadline: Instant) -> Option<TimerTicket>;

    async fn pending_timer(&self, conversation_id: u64) -> Option<TimerTicket>;

    /// Cancela o timer pendente; o disparo verifica o ticket e não age
    async fn cancel_timer(&self, conversation_id: u64);

    /// Remove o timer somente se ainda for o mesmo ticket
    async fn complete_timer(&self, conversation_id: u64, ticket_id: u64) -> bool;

    async fn is_auto_closed(&self, conversation_id: u64) -> bool;

    async fn set_auto_closed(&self, conversation_id: u64, closed: bool);

    /// Marca (ou desmarca) que o próximo `resolved` desta conversa veio do bot
    async fn set_closed_by_bot(&self, conversation_id: u64, marked: bool);

    /// Consome a marca de fechamento pelo bot
    async fn take_closed_by_bot(&self, conversation_id: u64) -> bool;

    /// Descarta contadores, flags e marca da conversa; o timer pendente fica
    async fn forget(&self, conversation_id: u64);

    // ===== deduplicação =====

    /// `true` se o mesmo conteúdo normalizado foi processado dentro da janela;
    /// caso contrário registra a mensagem e devolve `false`
    async fn check_duplicate(&self, conversation_id: u64, normalized: &str, window: Duration) -> bool;
}

#[derive(Debug, Default)]
struct ConversationSlot {
    counters: Option<BTreeMap<String, u32>>,
    timer: Option<TimerTicket>,
    auto_closed: bool,
    closed_by_bot: bool,
}

impl ConversationSlot {
    fn is_empty(&self) -> bool {
        self.counters.is_none() && self.timer.is_none() && !self.auto_closed && !self.closed_by_bot
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    leases: HashMap<LockKey, Instant>,
    conversations: HashMap<u64, ConversationSlot>,
    /// Último conteúdo processado por conversa
    recent: HashMap<u64, (String, Instant)>,
    next_ticket: u64,
}

impl StoreInner {
    fn slot(&mut self, conversation_id: u64) -> &mut ConversationSlot {
        self.conversations.entry(conversation_id).or_default()
    }

    fn prune(&mut self, conversation_id: u64) {
        if self.conversations.get(&conversation_id).map_or(false, ConversationSlot::is_empty) {
            self.conversations.remove(&conversation_id);
        }
    }
}

/// Store em memória (processo único)
#[derive(Clone, Default)]
pub struct InMemoryStateStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove leases vencidos; chamado a cada aquisição
    fn sweep(leases: &mut HashMap<LockKey, Instant>, now: Instant) {
        leases.retain(|_, expires_at| now < *expires_at);
    }

    pub async fn lease_count(&self) -> usize {
        let now = Instant::now();
        let inner = self.inner.read().await;
        inner.leases.values().filter(|exp| now < **exp).count()
    }

    /// `true` enquanto a conversa tem estado guardado
    pub async fn tracks(&self, conversation_id: u64) -> bool {
        self.inner.read().await.conversations.contains_key(&conversation_id)
    }

    pub async fn tracked_conversations(&self) -> usize {
        self.inner.read().await.conversations.len()
    }
}

#[async_trait]
impl ConversationStateStore for InMemoryStateStore {
    async fn try_acquire(&self, key: &LockKey, ttl: Duration) -> bool {
        let now = Instant::now();
        let mut inner = self.inner.write().await;
        Self::sweep(&mut inner.leases, now);

        if inner.leases.contains_key(key) {
            return false;
        }
        inner.leases.insert(key.clone(), now + ttl);
        true
    }

    async fn release(&self, key: &LockKey) {
        self.inner.write().await.leases.remove(key);
    }

    async fn is_locked(&self, key: &LockKey) -> bool {
        let now = Instant::now();
        let inner = self.inner.read().await;
        inner.leases.get(key).map_or(false, |expires_at| now < *expires_at)
    }

    async fn counters(&self, conversation_id: u64) -> Option<BTreeMap<String, u32>> {
        let inner = self.inner.read().await;
        inner
            .conversations
            .get(&conversation_id)
            .and_then(|slot| slot.counters.clone())
    }

    async fn set_counters(&self, conversation_id: u64, counters: BTreeMap<String, u32>) {
        let mut inner = self.inner.write().await;
        inner.slot(conversation_id).counters = Some(counters);
    }

    async fn increment_counter(&self, conversation_id: u64, control_tag: &str) -> BTreeMap<String, u32> {
        let mut inner = self.inner.write().await;
        let counters = inner.slot(conversation_id).counters.get_or_insert_with(BTreeMap::new);
        *counters.entry(control_tag.to_string()).or_insert(0) += 1;
        counters.clone()
    }

    async fn try_set_timer(&self, conversation_id: u64, deadline: Instant) -> Option<TimerTicket> {
        let mut inner = self.inner.write().await;
        if inner.conversations.get(&conversation_id).and_then(|s| s.timer).is_some() {
            return None;
        }
        inner.next_ticket += 1;
        let ticket = TimerTicket { id: inner.next_ticket, deadline };
        inner.slot(conversation_id).timer = Some(ticket);
        Some(ticket)
    }

    async fn pending_timer(&self, conversation_id: u64) -> Option<TimerTicket> {
        let inner = self.inner.read().await;
        inner.conversations.get(&conversation_id).and_then(|s| s.timer)
    }

    async fn cancel_timer(&self, conversation_id: u64) {
        let mut inner = self.inner.write().await;
        if let Some(slot) = inner.conversations.get_mut(&conversation_id) {
            slot.timer = None;
        }
        inner.prune(conversation_id);
    }

    async fn complete_timer(&self, conversation_id: u64, ticket_id: u64) -> bool {
        let mut inner = self.inner.write().await;
        let completed = match inner.conversations.get_mut(&conversation_id) {
            Some(slot) if slot.timer.map(|t| t.id) == Some(ticket_id) => {
                slot.timer = None;
                true
            }
            _ => false,
        };
        inner.prune(conversation_id);
        completed
    }

    async fn is_auto_closed(&self, conversation_id: u64) -> bool {
        let inner = self.inner.read().await;
        inner
            .conversations
            .get(&conversation_id)
            .map_or(false, |s| s.auto_closed)
    }

    async fn set_auto_closed(&self, conversation_id: u64, closed: bool) {
        let mut inner = self.inner.write().await;
        inner.slot(conversation_id).auto_closed = closed;
        inner.prune(conversation_id);
    }

    async fn set_closed_by_bot(&self, conversation_id: u64, marked: bool) {
        let mut inner = self.inner.write().await;
        inner.slot(conversation_id).closed_by_bot = marked;
        inner.prune(conversation_id);
    }

    async fn take_closed_by_bot(&self, conversation_id: u64) -> bool {
        let mut inner = self.inner.write().await;
        let marked = match inner.conversations.get_mut(&conversation_id) {
            Some(slot) => std::mem::take(&mut slot.closed_by_bot),
            None => false,
        };
        inner.prune(conversation_id);
        marked
    }

    async fn forget(&self, conversation_id: u64) {
        let mut inner = self.inner.write().await;
        if let Some(slot) = inner.conversations.get_mut(&conversation_id) {
            slot.counters = None;
            slot.auto_closed = false;
            slot.closed_by_bot = false;
        }
        inner.prune(conversation_id);
    }

    async fn check_duplicate(&self, conversation_id: u64, normalized: &str, window: Duration) -> bool {
        let now = Instant::now();
        let mut inner = self.inner.write().await;
        inner.recent.retain(|_, (_, at)| now.duration_since(*at) < window);

        if let Some((last, _)) = inner.recent.get(&conversation_id) {
            if last == normalized {
                return true;
            }
        }
        inner.recent.insert(conversation_id, (normalized.to_string(), now));
        false
    }
}
