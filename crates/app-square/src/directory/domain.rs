use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for directory applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(pub i64);

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier wrapper for submissions awaiting review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub i64);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raised when a stored or submitted label is not a member of its enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str, labels: &[&str]) -> Self {
        Self {
            kind,
            value: value.to_string(),
            expected: labels.join(", "),
        }
    }
}

/// Which directory listing an application belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Group,
    Province,
}

impl Section {
    pub const ALL: [Section; 2] = [Section::Group, Section::Province];

    pub const fn label(self) -> &'static str {
        match self {
            Section::Group => "group",
            Section::Province => "province",
        }
    }
}

impl FromStr for Section {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|section| section.label() == value)
            .ok_or_else(|| UnknownVariant::new("section", value, &labels(&Self::ALL, |s| s.label())))
    }
}

/// Lifecycle status of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppStatus {
    Available,
    Approval,
    Beta,
    Offline,
}

impl AppStatus {
    pub const ALL: [AppStatus; 4] = [
        AppStatus::Available,
        AppStatus::Approval,
        AppStatus::Beta,
        AppStatus::Offline,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            AppStatus::Available => "available",
            AppStatus::Approval => "approval",
            AppStatus::Beta => "beta",
            AppStatus::Offline => "offline",
        }
    }
}

impl FromStr for AppStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.label() == value)
            .ok_or_else(|| UnknownVariant::new("status", value, &labels(&Self::ALL, |s| s.label())))
    }
}

/// Implementation difficulty tier, rendered with a leading capital.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    #[default]
    Low,
    Medium,
    High,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Low, Difficulty::Medium, Difficulty::High];

    pub const fn label(self) -> &'static str {
        match self {
            Difficulty::Low => "Low",
            Difficulty::Medium => "Medium",
            Difficulty::High => "High",
        }
    }
}

impl FromStr for Difficulty {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.label() == value)
            .ok_or_else(|| {
                UnknownVariant::new("difficulty", value, &labels(&Self::ALL, |d| d.label()))
            })
    }
}

/// The kind of benefit an application claims to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EffectivenessType {
    #[default]
    CostReduction,
    EfficiencyGain,
    PerceptionUplift,
    RevenueGrowth,
}

impl EffectivenessType {
    pub const ALL: [EffectivenessType; 4] = [
        EffectivenessType::CostReduction,
        EffectivenessType::EfficiencyGain,
        EffectivenessType::PerceptionUplift,
        EffectivenessType::RevenueGrowth,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            EffectivenessType::CostReduction => "cost_reduction",
            EffectivenessType::EfficiencyGain => "efficiency_gain",
            EffectivenessType::PerceptionUplift => "perception_uplift",
            EffectivenessType::RevenueGrowth => "revenue_growth",
        }
    }
}

impl FromStr for EffectivenessType {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.label() == value)
            .ok_or_else(|| {
                UnknownVariant::new(
                    "effectiveness_type",
                    value,
                    &labels(&Self::ALL, |k| k.label()),
                )
            })
    }
}

/// Data sensitivity level declared on a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataLevel {
    L1,
    L2,
    L3,
    L4,
}

impl DataLevel {
    pub const ALL: [DataLevel; 4] = [DataLevel::L1, DataLevel::L2, DataLevel::L3, DataLevel::L4];

    pub const fn label(self) -> &'static str {
        match self {
            DataLevel::L1 => "L1",
            DataLevel::L2 => "L2",
            DataLevel::L3 => "L3",
            DataLevel::L4 => "L4",
        }
    }
}

impl FromStr for DataLevel {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.label() == value)
            .ok_or_else(|| {
                UnknownVariant::new("data_level", value, &labels(&Self::ALL, |l| l.label()))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    #[default]
    Direct,
    Profile,
}

impl AccessMode {
    pub const ALL: [AccessMode; 2] = [AccessMode::Direct, AccessMode::Profile];

    pub const fn label(self) -> &'static str {
        match self {
            AccessMode::Direct => "direct",
            AccessMode::Profile => "profile",
        }
    }
}

impl FromStr for AccessMode {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.label() == value)
            .ok_or_else(|| {
                UnknownVariant::new("access_mode", value, &labels(&Self::ALL, |m| m.label()))
            })
    }
}

/// Review state of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 3] = [
        SubmissionStatus::Pending,
        SubmissionStatus::Approved,
        SubmissionStatus::Rejected,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.label() == value)
            .ok_or_else(|| {
                UnknownVariant::new(
                    "submission status",
                    value,
                    &labels(&Self::ALL, |s| s.label()),
                )
            })
    }
}

/// Labels accepted for a ranking row's metric type.
pub const METRIC_TYPES: [&str; 3] = ["composite", "growth_rate", "likes"];

fn labels<T: Copy>(values: &[T], label: impl Fn(T) -> &'static str) -> Vec<&'static str> {
    values.iter().copied().map(label).collect()
}

/// A directory entry for one AI-enabled tool or service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: AppId,
    pub name: String,
    pub org: String,
    pub section: Section,
    pub category: String,
    pub description: String,
    pub status: AppStatus,
    pub monthly_calls: f64,
    pub release_date: NaiveDate,
    pub api_open: bool,
    pub difficulty: Difficulty,
    pub contact_name: String,
    pub highlight: String,
    pub access_mode: AccessMode,
    pub access_url: String,
    pub target_system: String,
    pub target_users: String,
    pub problem_statement: String,
    pub effectiveness_type: EffectivenessType,
    pub effectiveness_metric: String,
    pub ranking_enabled: bool,
    pub ranking_weight: f64,
    pub ranking_tags: String,
    pub last_ranking_update: Option<DateTime<Utc>>,
}

impl Application {
    pub fn summary(&self) -> AppSummary {
        AppSummary {
            id: self.id,
            name: self.name.clone(),
            org: self.org.clone(),
            section: self.section,
            category: self.category.clone(),
            description: self.description.clone(),
            status: self.status,
            monthly_calls: self.monthly_calls,
            release_date: self.release_date,
        }
    }
}

/// Compact application view embedded in leaderboard rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSummary {
    pub id: AppId,
    pub name: String,
    pub org: String,
    pub section: Section,
    pub category: String,
    pub description: String,
    pub status: AppStatus,
    pub monthly_calls: f64,
    pub release_date: NaiveDate,
}

/// Insert payload for a directory entry; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewApplication {
    pub name: String,
    pub org: String,
    pub section: Section,
    pub category: String,
    pub description: String,
    pub status: AppStatus,
    pub monthly_calls: f64,
    pub release_date: NaiveDate,
    pub difficulty: Difficulty,
    pub problem_statement: String,
    pub target_system: String,
    pub effectiveness_type: EffectivenessType,
    pub effectiveness_metric: String,
    pub ranking_enabled: bool,
    pub ranking_weight: f64,
    pub ranking_tags: String,
}

/// Directory listing filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppFilter {
    pub section: Option<Section>,
    pub status: Option<AppStatus>,
    pub category: Option<String>,
    pub query: Option<String>,
}

/// Batch update of the ranking-specific fields of several applications.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RankingParamsUpdate {
    pub app_ids: Vec<AppId>,
    #[serde(default)]
    pub ranking_enabled: Option<bool>,
    #[serde(default)]
    pub ranking_weight: Option<f64>,
    #[serde(default)]
    pub ranking_tags: Option<String>,
}

impl RankingParamsUpdate {
    pub fn is_empty(&self) -> bool {
        self.ranking_enabled.is_none() && self.ranking_weight.is_none() && self.ranking_tags.is_none()
    }
}

/// Headline counters shown on the portal home page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryStats {
    pub pending: i64,
    pub approved_period: i64,
    pub total_apps: i64,
}

/// Curated scenario suggestion for the home page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub scene: String,
}

pub const RECOMMENDATIONS: [(&str, &str); 3] = [
    ("智能客服助手", "7×24 小时自动应答"),
    ("AI会议助手", "自动生成会议纪要"),
    ("智能数据分析", "一键生成分析报告"),
];

/// Link into the OA rule pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleLink {
    pub title: String,
    pub href: String,
}

/// Rule page titles and their paths below the OA base URL.
pub const RULE_PAGES: [(&str, &str); 3] = [
    ("如何申报应用", "ai-app-square/rules/submission"),
    ("上榜评选标准", "ai-app-square/rules/ranking"),
    ("API接入指南", "ai-app-square/rules/api-integration"),
];

/// Raw intake payload; enumerated fields arrive as text and are checked by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionDraft {
    pub app_name: String,
    pub unit_name: String,
    pub contact: String,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub scenario: String,
    pub embedded_system: String,
    pub problem_statement: String,
    pub effectiveness_type: String,
    pub effectiveness_metric: String,
    pub data_level: String,
    pub expected_benefit: String,
    #[serde(default = "default_true")]
    pub ranking_enabled: bool,
    #[serde(default = "default_weight")]
    pub ranking_weight: f64,
    #[serde(default)]
    pub ranking_tags: String,
    #[serde(default)]
    pub ranking_dimensions: String,
}

fn default_category() -> String {
    "办公类".to_string()
}

fn default_true() -> bool {
    true
}

fn default_weight() -> f64 {
    1.0
}

/// Validated submission ready for persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub app_name: String,
    pub unit_name: String,
    pub contact: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub category: String,
    pub scenario: String,
    pub embedded_system: String,
    pub problem_statement: String,
    pub effectiveness_type: EffectivenessType,
    pub effectiveness_metric: String,
    pub data_level: DataLevel,
    pub expected_benefit: String,
    pub ranking_enabled: bool,
    pub ranking_weight: f64,
    pub ranking_tags: String,
    pub ranking_dimensions: String,
}

/// A request to list a new application in the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub app_name: String,
    pub unit_name: String,
    pub contact: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub category: String,
    pub scenario: String,
    pub embedded_system: String,
    pub problem_statement: String,
    pub effectiveness_type: EffectivenessType,
    pub effectiveness_metric: String,
    pub data_level: DataLevel,
    pub expected_benefit: String,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
    pub ranking_enabled: bool,
    pub ranking_weight: f64,
    pub ranking_tags: String,
    pub ranking_dimensions: String,
}

impl Submission {
    /// Directory entry created when the submission is approved on `today`.
    pub fn to_application(&self, today: NaiveDate) -> NewApplication {
        NewApplication {
            name: self.app_name.clone(),
            org: self.unit_name.clone(),
            section: Section::Province,
            category: self.category.clone(),
            description: self.scenario.clone(),
            status: AppStatus::Available,
            monthly_calls: 0.0,
            release_date: today,
            difficulty: Difficulty::Low,
            problem_statement: self.problem_statement.clone(),
            target_system: self.embedded_system.clone(),
            effectiveness_type: self.effectiveness_type,
            effectiveness_metric: self.effectiveness_metric.clone(),
            ranking_enabled: self.ranking_enabled,
            ranking_weight: self.ranking_weight,
            ranking_tags: self.ranking_tags.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_from_str() {
        for status in AppStatus::ALL {
            assert_eq!(status.label().parse::<AppStatus>(), Ok(status));
        }
        for kind in EffectivenessType::ALL {
            assert_eq!(kind.label().parse::<EffectivenessType>(), Ok(kind));
        }
        assert_eq!("High".parse::<Difficulty>(), Ok(Difficulty::High));
    }

    #[test]
    fn unknown_labels_list_the_allowed_values() {
        let err = "retired".parse::<AppStatus>().unwrap_err();
        assert_eq!(err.kind, "status");
        assert!(err.to_string().contains("available, approval, beta, offline"));
        assert!("high".parse::<Difficulty>().is_err());
    }

    #[test]
    fn serde_uses_wire_labels() {
        let json = serde_json::to_value(EffectivenessType::RevenueGrowth).expect("serializes");
        assert_eq!(json, serde_json::json!("revenue_growth"));
        let tier: Difficulty = serde_json::from_str("\"Medium\"").expect("deserializes");
        assert_eq!(tier, Difficulty::Medium);
    }
}
