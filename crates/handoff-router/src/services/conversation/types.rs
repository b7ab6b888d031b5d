use std::fmt;

use crate::config::QueuesConfig;

/// Position of a user in the menu flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversationState {
    Start,
    BranchSelection,
    MenuBranchA,
    MenuBranchB,
    PostSaleBranchA,
    PostSaleBranchB,
    Done,
}

impl ConversationState {
    pub const ALL: [ConversationState; 7] = [
        Self::Start,
        Self::BranchSelection,
        Self::MenuBranchA,
        Self::MenuBranchB,
        Self::PostSaleBranchA,
        Self::PostSaleBranchB,
        Self::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::BranchSelection => "branch_selection",
            Self::MenuBranchA => "menu_branch_a",
            Self::MenuBranchB => "menu_branch_b",
            Self::PostSaleBranchA => "post_sale_branch_a",
            Self::PostSaleBranchB => "post_sale_branch_b",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Escalation targets reachable from the menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKey {
    BranchADefault,
    BranchAPostSale,
    BranchBDefault,
    BranchBPostSale,
}

impl QueueKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BranchADefault => "branch_a_default",
            Self::BranchAPostSale => "branch_a_post_sale",
            Self::BranchBDefault => "branch_b_default",
            Self::BranchBPostSale => "branch_b_post_sale",
        }
    }
}

/// Static queue-key -> PBX queue id mapping, fixed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueTargets {
    branch_a_default: u64,
    branch_a_post_sale: u64,
    branch_b_default: u64,
    branch_b_post_sale: u64,
}

impl QueueTargets {
    pub const fn new(
        branch_a_default: u64,
        branch_a_post_sale: u64,
        branch_b_default: u64,
        branch_b_post_sale: u64,
    ) -> Self {
        Self {
            branch_a_default,
            branch_a_post_sale,
            branch_b_default,
            branch_b_post_sale,
        }
    }

    pub fn resolve(&self, key: QueueKey) -> u64 {
        match key {
            QueueKey::BranchADefault => self.branch_a_default,
            QueueKey::BranchAPostSale => self.branch_a_post_sale,
            QueueKey::BranchBDefault => self.branch_b_default,
            QueueKey::BranchBPostSale => self.branch_b_post_sale,
        }
    }
}

impl From<&QueuesConfig> for QueueTargets {
    fn from(cfg: &QueuesConfig) -> Self {
        Self::new(
            cfg.branch_a_default,
            cfg.branch_a_post_sale,
            cfg.branch_b_default,
            cfg.branch_b_post_sale,
        )
    }
}

/// Whether a step hands the user to a human queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirective {
    None,
    Transfer(QueueKey),
}

/// Output of one engine step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: ConversationState,
    pub reply: &'static str,
    pub directive: TransferDirective,
}

impl Transition {
    pub(crate) fn stay(next: ConversationState, reply: &'static str) -> Self {
        Self {
            next,
            reply,
            directive: TransferDirective::None,
        }
    }

    pub(crate) fn escalate(reply: &'static str, queue: QueueKey) -> Self {
        Self {
            next: ConversationState::Done,
            reply,
            directive: TransferDirective::Transfer(queue),
        }
    }
}
