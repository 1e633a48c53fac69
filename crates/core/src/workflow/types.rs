//! Workflow domain types.
//!
//! This module defines the enumerations shared by the registry, the
//! interpreter, and the persistence layer: workflow kinds, governed
//! entity kinds, approval types, and approval responses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of workflow process, one per registered state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    /// Publication approval for a funding opportunity.
    OpportunityPublish,
    /// Review of a submitted application.
    ApplicationReview,
}

impl WorkflowKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpportunityPublish => "opportunity_publish",
            Self::ApplicationReview => "application_review",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "opportunity_publish" => Some(Self::OpportunityPublish),
            "application_review" => Some(Self::ApplicationReview),
            _ => None,
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of domain entity a workflow governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A funding opportunity.
    Opportunity,
    /// A submitted application.
    Application,
}

impl EntityKind {
    /// Returns the string representation of the entity kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opportunity => "opportunity",
            Self::Application => "application",
        }
    }

    /// Parses an entity kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "opportunity" => Some(Self::Opportunity),
            "application" => Some(Self::Application),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Named approval requirement gating a state's outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalType {
    /// Baseline approval for publishing an opportunity.
    OpportunityPublishBasic,
    /// Baseline approval for accepting an application.
    ApplicationReviewBasic,
}

impl ApprovalType {
    /// Returns the string representation of the approval type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpportunityPublishBasic => "opportunity_publish_basic",
            Self::ApplicationReviewBasic => "application_review_basic",
        }
    }

    /// Parses an approval type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "opportunity_publish_basic" => Some(Self::OpportunityPublishBasic),
            "application_review_basic" => Some(Self::ApplicationReviewBasic),
            _ => None,
        }
    }
}

impl fmt::Display for ApprovalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Response recorded on an approval record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalResponse {
    /// The approver approved.
    Approve,
    /// The approver rejected.
    Reject,
}

impl ApprovalResponse {
    /// Returns the string representation of the response.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    /// Parses a response from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "approve" => Some(Self::Approve),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

impl fmt::Display for ApprovalResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
