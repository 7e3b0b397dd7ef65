//! Core document, role and ledger record types
use chrono::{DateTime, TimeZone, Utc};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::error::WorkflowError;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    #[n(0)]
    MaterialRequest,
    #[n(1)]
    ManpowerRequest,
    #[n(2)]
    Project,
}

/// Approver seats. A role is a seat, not a person: two users sharing a
/// seat still only get one decision per document.
#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum Role {
    #[n(0)]
    ProjectManager,
    #[n(1)]
    AreaManager,
    #[n(2)]
    Ceo,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    #[n(0)]
    Pending(#[n(0)] Role),
    #[n(1)]
    Approved,
    #[n(2)]
    Denied(#[n(0)] Role),
    #[n(3)]
    Ongoing,
    #[n(4)]
    Completed,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    #[n(0)]
    Approved,
    #[n(1)]
    Denied,
}

#[derive(Debug, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

// chrono zones carry no ordering of their own, so compare the instants
impl<T: TimeZone> PartialEq for TimeStamp<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T: TimeZone> Eq for TimeStamp<T> {}

impl<T: TimeZone> PartialOrd for TimeStamp<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: TimeZone> Ord for TimeStamp<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

/// One immutable ledger entry.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRecord {
    #[n(0)]
    pub role: Role,
    #[n(1)]
    pub actor_id: String,
    #[n(2)]
    pub decision: Decision,
    #[n(3)]
    pub reason: Option<String>, // only kept for denials
    #[n(4)]
    pub timestamp: TimeStamp<Utc>,
}

/// A material request, manpower request or project moving through the workflow.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Document {
    #[n(0)]
    pub id: String, // bech32 encoded uuid7, prefix depends on kind
    #[n(1)]
    pub kind: DocumentKind,
    #[n(2)]
    pub status: Status,
    #[n(3)]
    pub approvals: super::ledger::ApprovalLedger,
    #[n(4)]
    pub received_at: Option<TimeStamp<Utc>>,
    #[n(5)]
    pub created_by: String,
}

impl DocumentKind {
    /// Human readable prefix used when minting document ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            DocumentKind::MaterialRequest => "mreq_",
            DocumentKind::ManpowerRequest => "hreq_",
            DocumentKind::Project => "proj_",
        }
    }

    pub fn is_request(&self) -> bool {
        !matches!(self, DocumentKind::Project)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DocumentKind::MaterialRequest => "material request",
            DocumentKind::ManpowerRequest => "manpower request",
            DocumentKind::Project => "project",
        };
        f.write_str(label)
    }
}

impl Role {
    pub const ALL: [Role; 3] = [Role::ProjectManager, Role::AreaManager, Role::Ceo];

    /// Short code stored in ledgers and status labels.
    pub fn code(&self) -> &'static str {
        match self {
            Role::ProjectManager => "PM",
            Role::AreaManager => "AM",
            Role::Ceo => "CEO",
        }
    }

    /// Full profile title. Parses back to the same role.
    pub fn title(&self) -> &'static str {
        match self {
            Role::ProjectManager => "Project Manager",
            Role::AreaManager => "Area Manager",
            Role::Ceo => "Chief Executive Officer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// The one place where profile strings become role codes.
impl FromStr for Role {
    type Err = WorkflowError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key = value
            .trim()
            .to_ascii_lowercase()
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        Role::ALL
            .into_iter()
            .find(|role| {
                key == role.code().to_ascii_lowercase() || key == role.title().to_ascii_lowercase()
            })
            .ok_or_else(|| WorkflowError::UnknownRole {
                kind: None,
                role: value.to_string(),
            })
    }
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Approved | Status::Denied(_))
    }

    pub fn pending_role(&self) -> Option<Role> {
        match self {
            Status::Pending(role) => Some(*role),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Pending(role) => write!(f, "Pending {role}"),
            Status::Approved => f.write_str("Approved"),
            Status::Denied(role) => write!(f, "Denied by {role}"),
            Status::Ongoing => f.write_str("Ongoing"),
            Status::Completed => f.write_str("Completed"),
        }
    }
}

impl FromStr for Status {
    type Err = WorkflowError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        match value {
            "Approved" => return Ok(Status::Approved),
            "Ongoing" => return Ok(Status::Ongoing),
            "Completed" => return Ok(Status::Completed),
            _ => {}
        }

        if let Some(role) = value.strip_prefix("Pending ") {
            return Ok(Status::Pending(role.parse()?));
        }
        if let Some(role) = value.strip_prefix("Denied by ") {
            return Ok(Status::Denied(role.parse()?));
        }

        Err(WorkflowError::UnknownStatus(value.to_string()))
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Approved => f.write_str("approved"),
            Decision::Denied => f.write_str("denied"),
        }
    }
}

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    /// `None` when the fields do not name a real instant.
    pub fn new_with(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        min: u32,
        sec: u32,
    ) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(Self)
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl fmt::Display for TimeStamp<Utc> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

impl ApprovalRecord {
    pub fn approved(role: Role, actor_id: impl Into<String>, timestamp: TimeStamp<Utc>) -> Self {
        Self {
            role,
            actor_id: actor_id.into(),
            decision: Decision::Approved,
            reason: None,
            timestamp,
        }
    }

    pub fn denied(
        role: Role,
        actor_id: impl Into<String>,
        reason: impl Into<String>,
        timestamp: TimeStamp<Utc>,
    ) -> Self {
        Self {
            role,
            actor_id: actor_id.into(),
            decision: Decision::Denied,
            reason: Some(reason.into()),
            timestamp,
        }
    }

    /// sha256 over the CBOR encoding; stable id for audit consumers.
    pub fn digest(&self) -> Result<String, WorkflowError> {
        let cbor = minicbor::to_vec(self)
            .map_err(|e| super::error::StoreError::Encode(e.to_string()))?;
        Ok(sha256::digest(&cbor))
    }
}

impl Document {
    pub fn ledger(&self) -> &super::ledger::ApprovalLedger {
        &self.approvals
    }
}
