//! Variant registry
//!
//! Each variant lives in its own slot behind its own mutex, so writes for
//! different variants never contend. A slot tracks the latest evaluation
//! sequence number it issued; results carrying an older number are dropped.

use super::params::VariantParams;
use crate::guide::Evidence;
use crate::remote::VariantReply;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

const VARIANT_LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Evaluation status of one variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SlotStatus {
    Idle,
    Pending { seq: u64 },
    Ready,
    Failed { message: String },
}

/// One configured variant with its last-known result and reviewer judgments
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variant {
    pub id: String,
    pub label: String,
    pub params: VariantParams,
    pub reply: String,
    pub evidence: Vec<Evidence>,
    pub draft_snapshot: Option<Value>,
    pub checks: BTreeMap<String, bool>,
    pub notes: String,
    pub status: SlotStatus,
}

impl Variant {
    pub fn new(id: impl Into<String>, label: impl Into<String>, params: VariantParams) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            params,
            reply: String::new(),
            evidence: Vec::new(),
            draft_snapshot: None,
            checks: BTreeMap::new(),
            notes: String::new(),
            status: SlotStatus::Idle,
        }
    }
}

/// A claim on the next result for a slot
#[derive(Debug, Clone)]
pub struct Ticket {
    pub seq: u64,
    pub params: VariantParams,
    pub cancel: CancellationToken,
}

struct SlotState {
    variant: Variant,
    latest_seq: u64,
    inflight: Option<CancellationToken>,
}

/// Independently locked home of one variant
pub struct VariantSlot {
    id: String,
    state: Mutex<SlotState>,
}

impl VariantSlot {
    fn new(variant: Variant) -> Self {
        Self {
            id: variant.id.clone(),
            state: Mutex::new(SlotState {
                variant,
                latest_seq: 0,
                inflight: None,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn snapshot(&self) -> Variant {
        self.state.lock().unwrap().variant.clone()
    }

    /// Issue the next sequence number, cancelling the previous in-flight call.
    ///
    /// The previous reply stays visible until the new one lands.
    pub fn begin(&self) -> Ticket {
        let mut state = self.state.lock().unwrap();
        if let Some(previous) = state.inflight.take() {
            previous.cancel();
        }
        state.latest_seq += 1;
        let seq = state.latest_seq;
        let cancel = CancellationToken::new();
        state.inflight = Some(cancel.clone());
        state.variant.status = SlotStatus::Pending { seq };
        Ticket {
            seq,
            params: state.variant.params,
            cancel,
        }
    }

    /// Store a reply if `seq` is still the latest. Returns false when stale.
    pub fn apply(&self, seq: u64, reply: VariantReply) -> bool {
        let mut state = self.state.lock().unwrap();
        if seq != state.latest_seq {
            return false;
        }
        state.inflight = None;
        let variant = &mut state.variant;
        variant.reply = reply.reply;
        variant.evidence = reply.evidence;
        variant.draft_snapshot = reply.draft_snapshot;
        variant.status = SlotStatus::Ready;
        true
    }

    /// Record a failure if `seq` is still the latest; the previous reply is kept
    pub fn fail(&self, seq: u64, message: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        if seq != state.latest_seq {
            return false;
        }
        state.inflight = None;
        state.variant.status = SlotStatus::Failed {
            message: message.to_string(),
        };
        true
    }

    /// Reviewer-side edit under the slot lock
    pub fn update<R>(&self, edit: impl FnOnce(&mut Variant) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        edit(&mut state.variant)
    }
}

/// Ordered, uniquely identified collection of variants
pub struct VariantRegistry {
    slots: RwLock<Vec<Arc<VariantSlot>>>,
}

impl Default for VariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl VariantRegistry {
    /// Registry holding the two built-in variants
    pub fn new() -> Self {
        let defaults = vec![
            Variant::new("A", "Variant A", VariantParams::default()),
            Variant::new("B", "Variant B", VariantParams::cautious()),
        ];
        Self {
            slots: RwLock::new(
                defaults
                    .into_iter()
                    .map(|v| Arc::new(VariantSlot::new(v)))
                    .collect(),
            ),
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<VariantSlot>> {
        self.slots
            .read()
            .unwrap()
            .iter()
            .find(|slot| slot.id() == id)
            .cloned()
    }

    pub fn slots(&self) -> Vec<Arc<VariantSlot>> {
        self.slots.read().unwrap().clone()
    }

    pub fn snapshot(&self) -> Vec<Variant> {
        self.slots().iter().map(|slot| slot.snapshot()).collect()
    }

    /// Append a variant with default params and the next sequential label
    pub fn add(&self) -> Arc<VariantSlot> {
        let mut slots = self.slots.write().unwrap();
        let position = slots.len() + 1;
        let mut id = format!("V{position}");
        let mut suffix = 1;
        while slots.iter().any(|slot| slot.id() == id) {
            suffix += 1;
            id = format!("V{position}_{suffix}");
        }
        let slot = Arc::new(VariantSlot::new(Variant::new(
            id,
            variant_label(slots.len()),
            VariantParams::default(),
        )));
        slots.push(Arc::clone(&slot));
        slot
    }
}

/// Label for the variant at zero-based `index`
fn variant_label(index: usize) -> String {
    match VARIANT_LETTERS.chars().nth(index) {
        Some(letter) => format!("Variant {letter}"),
        None => format!("Variant V{}", index + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(text: &str) -> VariantReply {
        VariantReply {
            reply: text.to_string(),
            evidence: vec![],
            draft_snapshot: None,
        }
    }

    #[test]
    fn test_defaults() {
        let registry = VariantRegistry::new();
        let variants = registry.snapshot();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].label, "Variant A");
        assert_eq!(variants[1].params, VariantParams::cautious());
        assert_eq!(variants[1].status, SlotStatus::Idle);
    }

    #[test]
    fn test_added_variant_labels() {
        let registry = VariantRegistry::new();
        let third = registry.add();
        assert_eq!(third.id(), "V3");
        assert_eq!(third.snapshot().label, "Variant C");
        assert_eq!(third.snapshot().params, VariantParams::default());
        assert_eq!(variant_label(26), "Variant V27");
    }

    #[test]
    fn test_stale_result_is_dropped() {
        let registry = VariantRegistry::new();
        let slot = registry.get("A").unwrap();

        let first = slot.begin();
        let second = slot.begin();
        assert!(first.cancel.is_cancelled());
        assert!(!second.cancel.is_cancelled());

        assert!(slot.apply(second.seq, reply("new")));
        assert!(!slot.apply(first.seq, reply("old")));
        assert_eq!(slot.snapshot().reply, "new");
        assert_eq!(slot.snapshot().status, SlotStatus::Ready);
    }

    #[test]
    fn test_failure_keeps_previous_reply() {
        let registry = VariantRegistry::new();
        let slot = registry.get("B").unwrap();
        let ticket = slot.begin();
        slot.apply(ticket.seq, reply("kept"));

        let ticket = slot.begin();
        assert_eq!(slot.snapshot().reply, "kept");
        assert!(slot.fail(ticket.seq, "timeout"));

        let variant = slot.snapshot();
        assert_eq!(variant.reply, "kept");
        assert_eq!(
            variant.status,
            SlotStatus::Failed {
                message: "timeout".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_variant() {
        assert!(VariantRegistry::new().get("Z").is_none());
    }
}
