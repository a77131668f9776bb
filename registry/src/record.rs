//! Dataset records and submission inputs.

use daiv_types::{
    AccountId, ContentHash, DatasetId, DatasetStatus, ProposalId, RejectionReason, Timestamp,
    TokenAmount,
};
use serde::{Deserialize, Serialize};

/// Descriptive metadata entered by the contributor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetMetadata {
    pub title: String,
    pub description: String,
    pub category: String,
    pub license: String,
    pub tags: Vec<String>,
}

impl DatasetMetadata {
    /// Number of non-blank fields; this is what the metadata bonus pays for.
    pub fn filled_field_count(&self) -> u32 {
        let text = [&self.title, &self.description, &self.category, &self.license]
            .into_iter()
            .filter(|f| !f.trim().is_empty())
            .count() as u32;
        let tags = u32::from(self.tags.iter().any(|t| !t.trim().is_empty()));
        text + tags
    }
}

/// Everything a contributor provides when submitting a dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub contributor: AccountId,
    pub content_hash: ContentHash,
    pub size_bytes: u64,
    pub metadata_fields_filled: u32,
    pub metadata: DatasetMetadata,
    pub stake: TokenAmount,
}

impl Submission {
    /// A submission without descriptive metadata.
    pub fn new(
        contributor: AccountId,
        content_hash: ContentHash,
        size_bytes: u64,
        metadata_fields_filled: u32,
        stake: TokenAmount,
    ) -> Self {
        Self {
            contributor,
            content_hash,
            size_bytes,
            metadata_fields_filled,
            metadata: DatasetMetadata::default(),
            stake,
        }
    }

    /// A submission whose filled-field count is derived from `metadata`.
    pub fn with_metadata(
        contributor: AccountId,
        content_hash: ContentHash,
        size_bytes: u64,
        metadata: DatasetMetadata,
        stake: TokenAmount,
    ) -> Self {
        Self {
            contributor,
            content_hash,
            size_bytes,
            metadata_fields_filled: metadata.filled_field_count(),
            metadata,
            stake,
        }
    }
}

/// Decision delivered to [`crate::DatasetRegistry::finalize`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Approved,
    Rejected(RejectionReason),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: DatasetId,
    pub contributor: AccountId,
    pub content_hash: ContentHash,
    pub size_bytes: u64,
    pub metadata_fields_filled: u32,
    pub metadata: DatasetMetadata,
    pub status: DatasetStatus,
    /// Computed at submission, minted on approval.
    pub base_reward: TokenAmount,
    pub total_rewards_paid: TokenAmount,
    pub created_at: Timestamp,
    /// Cumulative downloads already paid for.
    pub usage_baseline: u64,
    pub rejection: Option<RejectionReason>,
    /// The approval proposal, once a vote has been opened.
    pub proposal_id: Option<ProposalId>,
    pub resolved_at: Option<Timestamp>,
}

/// Optional criteria for listing dataset records. Unset fields match all.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct DatasetFilter {
    pub status: Option<DatasetStatus>,
    /// Case-insensitive.
    pub category: Option<String>,
    /// Case-insensitive; matches any one of the record's tags.
    pub tag: Option<String>,
    pub contributor: Option<AccountId>,
}

impl DatasetFilter {
    pub fn matches(&self, record: &DatasetRecord) -> bool {
        if self.status.is_some_and(|s| s != record.status) {
            return false;
        }
        if let Some(category) = &self.category {
            if !record.metadata.category.eq_ignore_ascii_case(category.trim()) {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            let tag = tag.trim();
            if !record.metadata.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                return false;
            }
        }
        self.contributor
            .as_ref()
            .map_or(true, |c| *c == record.contributor)
    }
}
