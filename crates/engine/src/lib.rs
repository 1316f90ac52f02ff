// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! hub-engine: the daemon's moving parts.
//!
//! The event bus, health monitoring, SLA evaluation, shared sessions and
//! the council/verification state machines. Everything here is transport
//! agnostic: outbound agent calls go through the [`AgentCaller`] seam and
//! the connection server owns the sockets.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod bus;
pub mod checker;
pub mod council;
pub mod health;
pub mod member;
pub mod sessions;
pub mod sla;
pub mod verify;

pub use bus::{EventBus, EventReceiver, SubscriptionHandle};
pub use checker::{HealthChecker, HealthProbe, ProbeResult};
pub use council::{CouncilConfig, CouncilEngine, CouncilEvent, CouncilResult, MemberChunkEvent};
pub use health::HealthMonitor;
pub use member::{AgentCaller, CallOptions, ChunkKind, MemberChunk, MemberReply, ToolCallRecord};
#[cfg(any(test, feature = "test-support"))]
pub use member::{FakeCaller, ScriptedReply};
pub use sessions::{SessionError, SessionUpdate, SharedSession, SharedSessionManager};
pub use sla::{ResponseAction, SlaCoordinator, TaskSla};
pub use verify::{
    compute_evidence_hash, compute_spec_hash, justification_provided,
    requires_council_verification, requires_human_review, IndividualReview, PeerEvaluation,
    ReviewBundle, VerificationEngine, VerificationReceipt, VerificationResult, Verdict,
};
