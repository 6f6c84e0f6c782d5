//! Reconcile a zoning intent with the state of a live switch.
//!
//! A check is a single pass over one session:
//!
//! 1. **zone set**: `show zoneset brief vsan <id>` must list the zone set name
//!    followed by the vsan on one line; the output is kept for the zone
//!    presence test
//! 2. **device aliases**: `show device-alias database`, every declared pwwn
//!    already bound to another alias name is a conflict
//! 3. **zones**: presence in the cached brief output, then
//!    `show zone name <zone>` to count role-tagged members
//!
//! The first transport error stops the run. The report gathered so far is
//! returned inside [`RunFailure`] with `complete = false`. The session is
//! closed on every path.

use std::fmt::{self, Display, Formatter};

use mds_config_core::parse;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::commands::{show_zone, show_zoneset_brief, SHOW_DEVICE_ALIAS_DATABASE};
use crate::extract::{extract_device_alias_database, extract_zone_sets, ParseWarning};
use crate::intent::ZoningIntent;
pub use crate::model::ValidationTarget;
use crate::model::{Pwwn, Vsan};
use crate::session::{ContinuationPolicy, SessionTransport, TransportError};
use crate::settings::MemberLimits;
use crate::validate_rules::{brief_lists_zone_set, brief_mentions, count_members, exists_zone_set};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingZone {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingZoneSet {
    pub name: String,
    pub vsan: Vsan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverLimitZone {
    pub name: String,
    pub count: usize,
}

/// A declared pwwn is already bound to a device alias with another name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasConflict {
    pub pwwn: Pwwn,
    pub declared_host: String,
    pub existing_alias: String,
}

/// Member count observed for one zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneMemberCount {
    pub name: String,
    pub count: usize,
}

/// One report entry, for callers that want a single ordered list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationMismatch {
    MissingZoneSet(MissingZoneSet),
    AliasConflict(AliasConflict),
    MissingZone(MissingZone),
    OverLimitZone(OverLimitZone),
}

impl Display for ValidationMismatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ValidationMismatch::MissingZoneSet(m) => {
                write!(f, "zoneset {} does not exist in vsan {}", m.name, m.vsan)
            }
            ValidationMismatch::AliasConflict(c) => write!(
                f,
                "pwwn {} is already device-alias {} (declared as {})",
                c.pwwn, c.existing_alias, c.declared_host
            ),
            ValidationMismatch::MissingZone(m) => write!(f, "zone {} does not exist", m.name),
            ValidationMismatch::OverLimitZone(o) => {
                write!(f, "zone {} has {} members", o.name, o.count)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub target: ValidationTarget,
    /// False when a transport failure cut the run short.
    pub complete: bool,
    pub max_members: usize,
    /// Zone sets the switch lists in the target vsan.
    pub zone_sets_listed: Vec<String>,
    pub missing_zone_sets: Vec<MissingZoneSet>,
    pub alias_conflicts: Vec<AliasConflict>,
    pub missing_zones: Vec<MissingZone>,
    pub over_limit_zones: Vec<OverLimitZone>,
    pub zone_members: Vec<ZoneMemberCount>,
    pub warnings: Vec<ParseWarning>,
}

impl ValidationReport {
    pub fn new(target: ValidationTarget, max_members: usize) -> Self {
        Self {
            target,
            complete: false,
            max_members,
            zone_sets_listed: Vec::new(),
            missing_zone_sets: Vec::new(),
            alias_conflicts: Vec::new(),
            missing_zones: Vec::new(),
            over_limit_zones: Vec::new(),
            zone_members: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn violations(&self) -> Vec<ValidationMismatch> {
        let mut out = Vec::new();
        out.extend(
            self.missing_zone_sets
                .iter()
                .cloned()
                .map(ValidationMismatch::MissingZoneSet),
        );
        out.extend(
            self.alias_conflicts
                .iter()
                .cloned()
                .map(ValidationMismatch::AliasConflict),
        );
        out.extend(
            self.missing_zones
                .iter()
                .cloned()
                .map(ValidationMismatch::MissingZone),
        );
        out.extend(
            self.over_limit_zones
                .iter()
                .cloned()
                .map(ValidationMismatch::OverLimitZone),
        );
        out
    }

    pub fn violation_count(&self) -> usize {
        self.missing_zone_sets.len()
            + self.alias_conflicts.len()
            + self.missing_zones.len()
            + self.over_limit_zones.len()
    }

    pub fn is_clean(&self) -> bool {
        self.violation_count() == 0
    }
}

/// Where a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    ZoneSetCheck,
    DeviceAliasCheck,
    ZoneCheck,
    Close,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::ZoneSetCheck => "zone set check",
            Stage::DeviceAliasCheck => "device-alias check",
            Stage::ZoneCheck => "zone check",
            Stage::Close => "session close",
        })
    }
}

/// A run that could not finish.
///
/// `partial.complete` is false unless every check ran and only closing the
/// session failed.
#[derive(Debug, Error)]
#[error("{stage} failed: {error}")]
pub struct RunFailure {
    pub stage: Stage,
    #[source]
    pub error: TransportError,
    pub partial: ValidationReport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOptions {
    pub limits: MemberLimits,
    pub continuation: ContinuationPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    ZoneSetCheck,
    DeviceAliasCheck,
    ZoneCheck,
    Done,
}

struct Engine<'a> {
    intent: &'a ZoningIntent,
    options: &'a CheckOptions,
    state: State,
    zoneset_brief: String,
    report: ValidationReport,
}

impl<'a> Engine<'a> {
    fn new(intent: &'a ZoningIntent, target: &ValidationTarget, options: &'a CheckOptions) -> Self {
        Self {
            intent,
            options,
            state: State::Idle,
            zoneset_brief: String::new(),
            report: ValidationReport::new(target.clone(), options.limits.max_members),
        }
    }

    fn run<S>(&mut self, session: &mut S) -> Result<(), (Stage, TransportError)>
    where
        S: SessionTransport + ?Sized,
    {
        loop {
            self.state = match self.state {
                State::Idle => State::ZoneSetCheck,
                State::ZoneSetCheck => {
                    self.check_zone_set(session)
                        .map_err(|err| (Stage::ZoneSetCheck, err))?;
                    State::DeviceAliasCheck
                }
                State::DeviceAliasCheck => {
                    self.check_device_aliases(session)
                        .map_err(|err| (Stage::DeviceAliasCheck, err))?;
                    State::ZoneCheck
                }
                State::ZoneCheck => {
                    self.check_zones(session)
                        .map_err(|err| (Stage::ZoneCheck, err))?;
                    State::Done
                }
                State::Done => {
                    self.report.complete = true;
                    return Ok(());
                }
            };
            debug!(state = ?self.state, "check state");
        }
    }

    fn check_zone_set<S>(&mut self, session: &mut S) -> Result<(), TransportError>
    where
        S: SessionTransport + ?Sized,
    {
        let target = &self.report.target;
        info!(zoneset = %target.zoneset, vsan = %target.vsan, "validating zone set");
        let output = session.send_command(
            &show_zoneset_brief(target.vsan),
            self.options.continuation,
        )?;

        let listed = extract_zone_sets(&parse(&output));
        self.report.warnings.extend(listed.warnings);
        self.report.zone_sets_listed = listed
            .value
            .into_iter()
            .filter(|zone_set| zone_set.vsan == target.vsan)
            .map(|zone_set| zone_set.name)
            .collect();

        if !brief_lists_zone_set(&output, &target.zoneset, target.vsan) {
            warn!(
                zoneset = %target.zoneset,
                vsan = %target.vsan,
                listed = ?self.report.zone_sets_listed,
                "zone set not found"
            );
            self.report.missing_zone_sets.push(MissingZoneSet {
                name: target.zoneset.clone(),
                vsan: target.vsan,
            });
        } else if !exists_zone_set(&output, &target.zoneset, target.vsan) {
            warn!(
                zoneset = %target.zoneset,
                vsan = %target.vsan,
                listed = ?self.report.zone_sets_listed,
                "zone set name only matched as a substring of another zone set"
            );
        }
        self.zoneset_brief = output;
        Ok(())
    }

    fn check_device_aliases<S>(&mut self, session: &mut S) -> Result<(), TransportError>
    where
        S: SessionTransport + ?Sized,
    {
        info!(hosts = self.intent.hosts().len(), "validating device aliases");
        let output = session.send_command(SHOW_DEVICE_ALIAS_DATABASE, self.options.continuation)?;
        let db = extract_device_alias_database(&output);
        self.report.warnings.extend(db.warnings);

        for host in self.intent.hosts() {
            for existing in db.value.aliases_for(&host.pwwn) {
                if existing == &host.name {
                    continue;
                }
                warn!(pwwn = %host.pwwn, host = %host.name, existing = %existing, "device-alias conflict");
                self.report.alias_conflicts.push(AliasConflict {
                    pwwn: host.pwwn,
                    declared_host: host.name.clone(),
                    existing_alias: existing.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_zones<S>(&mut self, session: &mut S) -> Result<(), TransportError>
    where
        S: SessionTransport + ?Sized,
    {
        let limits = &self.options.limits;
        let vsan = self.report.target.vsan;

        for zone in self.intent.zones() {
            info!(zone = %zone.name, "validating zone");
            if !brief_mentions(&self.zoneset_brief, &zone.name, vsan) {
                self.report.missing_zones.push(MissingZone {
                    name: zone.name.clone(),
                });
            }

            let output = session.send_command(&show_zone(&zone.name), self.options.continuation)?;
            let count = count_members(&output);
            self.report.zone_members.push(ZoneMemberCount {
                name: zone.name.clone(),
                count,
            });

            if count > limits.max_members {
                warn!(zone = %zone.name, count, limit = limits.max_members, "zone over member limit");
                self.report.over_limit_zones.push(OverLimitZone {
                    name: zone.name.clone(),
                    count,
                });
            } else if count > limits.preferred_members {
                info!(
                    zone = %zone.name,
                    count,
                    preferred = limits.preferred_members,
                    "zone has more members than preferred"
                );
            }
        }
        Ok(())
    }
}

/// Run every check over `session` and close it afterwards.
pub fn run_check<S>(
    session: &mut S,
    intent: &ZoningIntent,
    target: &ValidationTarget,
    options: &CheckOptions,
) -> Result<ValidationReport, RunFailure>
where
    S: SessionTransport + ?Sized,
{
    let mut engine = Engine::new(intent, target, options);
    let outcome = engine.run(session);
    let closed = session.close();
    let report = engine.report;

    match (outcome, closed) {
        (Err((stage, error)), closed) => {
            if let Err(close_err) = closed {
                warn!(error = %close_err, "closing session after failure");
            }
            Err(RunFailure {
                stage,
                error,
                partial: report,
            })
        }
        (Ok(()), Err(error)) => Err(RunFailure {
            stage: Stage::Close,
            error,
            partial: report,
        }),
        (Ok(()), Ok(())) => Ok(report),
    }
}

/// Render a validation report for terminal output.
pub fn render_validation_text(report: &ValidationReport) -> String {
    let mut out = Vec::new();
    out.push(format!(
        "check {} complete={} max_members={}",
        report.target, report.complete, report.max_members
    ));
    out.push(format!(
        "result violations={} warnings={}",
        report.violation_count(),
        report.warnings.len()
    ));
    out.push(format!(
        "zonesets listed={}",
        if report.zone_sets_listed.is_empty() {
            "none".to_string()
        } else {
            report.zone_sets_listed.join(",")
        }
    ));

    out.push("zones".to_string());
    if report.zone_members.is_empty() {
        out.push("- none".to_string());
    }
    for zone in &report.zone_members {
        out.push(format!("- {} members={}", zone.name, zone.count));
    }

    out.push("violations".to_string());
    let violations = report.violations();
    if violations.is_empty() {
        out.push("- none".to_string());
    }
    for violation in violations {
        out.push(format!("- {violation}"));
    }

    if !report.warnings.is_empty() {
        out.push("warnings".to_string());
        for warning in &report.warnings {
            out.push(format!(
                "- line {}: {} ({})",
                warning.line, warning.reason, warning.text
            ));
        }
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::{
        render_validation_text, run_check, AliasConflict, CheckOptions, MissingZone,
        MissingZoneSet, OverLimitZone, Stage,
    };
    use crate::intent::ZoningIntent;
    use crate::model::{Pwwn, Role, ValidationTarget, Vsan};
    use crate::session::{ContinuationPolicy, SessionTransport, TransportError};

    /// Answers from a map; a command listed in `fail_on` times out.
    struct ScriptedSession {
        responses: HashMap<String, String>,
        fail_on: Option<String>,
        sent: Vec<String>,
        closed: bool,
    }

    impl ScriptedSession {
        fn new(responses: &[(&str, String)]) -> Self {
            Self {
                responses: responses
                    .iter()
                    .map(|(cmd, out)| (cmd.to_string(), out.clone()))
                    .collect(),
                fail_on: None,
                sent: Vec::new(),
                closed: false,
            }
        }
    }

    impl SessionTransport for ScriptedSession {
        fn send_command(
            &mut self,
            command: &str,
            _policy: ContinuationPolicy,
        ) -> Result<String, TransportError> {
            self.sent.push(command.to_string());
            if self.fail_on.as_deref() == Some(command) {
                return Err(TransportError::Timeout {
                    command: command.to_string(),
                    waited: std::time::Duration::from_secs(30),
                });
            }
            Ok(self.responses.get(command).cloned().unwrap_or_default())
        }

        fn close(&mut self) -> Result<(), TransportError> {
            self.closed = true;
            Ok(())
        }
    }

    fn pwwn(raw: &str) -> Pwwn {
        raw.parse().expect("pwwn")
    }

    fn target() -> ValidationTarget {
        ValidationTarget::new("ZS", Vsan::new(10).expect("vsan"))
    }

    fn single_host_intent(host: &str, wwn: &str, zone: &str) -> ZoningIntent {
        let mut builder = ZoningIntent::builder("fabric_a");
        builder
            .add_host(host, pwwn(wwn), Role::Initiator)
            .expect("host");
        builder.add_zone_member(zone, host);
        builder.build().expect("intent")
    }

    fn zone_output(name: &str, members: usize) -> String {
        let mut out = format!("zone name {name} vsan 10\n");
        for idx in 0..members {
            let role = if idx % 2 == 0 { "init" } else { "target" };
            out.push_str(&format!("  pwwn 10:00:00:00:00:00:{:02x}:{:02x} {role}\n", idx / 256, idx % 256));
        }
        out
    }

    #[test]
    fn oversized_existing_zone_is_over_limit_only() {
        let mut session = ScriptedSession::new(&[
            (
                "show zoneset brief vsan 10",
                "zoneset name ZS vsan 10\n  zone Z1\n".to_string(),
            ),
            ("show device-alias database", String::new()),
            ("show zone name Z1", zone_output("Z1", 60)),
        ]);
        let intent = single_host_intent("H1", "10:00:00:00:00:00:00:01", "Z1");

        let report = run_check(&mut session, &intent, &target(), &CheckOptions::default())
            .expect("complete run");

        assert!(report.complete);
        assert_eq!(
            report.over_limit_zones,
            vec![OverLimitZone {
                name: "Z1".into(),
                count: 60
            }]
        );
        assert!(report.missing_zones.is_empty());
        assert!(report.missing_zone_sets.is_empty());
        assert!(session.closed);
        assert_eq!(
            session.sent,
            vec![
                "show zoneset brief vsan 10",
                "show device-alias database",
                "show zone name Z1",
            ]
        );
    }

    #[test]
    fn pwwn_bound_to_other_alias_is_a_conflict() {
        let mut session = ScriptedSession::new(&[
            (
                "show zoneset brief vsan 10",
                "zoneset name ZS vsan 10\n  zone Z1\n".to_string(),
            ),
            (
                "show device-alias database",
                "device-alias name OLD pwwn 10:00:00:00:00:00:00:01\n\
                 device-alias name H2 pwwn 10:00:00:00:00:00:00:02\n"
                    .to_string(),
            ),
            ("show zone name Z1", zone_output("Z1", 2)),
        ]);
        let intent = single_host_intent("H1", "10:00:00:00:00:00:00:01", "Z1");

        let report = run_check(&mut session, &intent, &target(), &CheckOptions::default())
            .expect("complete run");

        assert_eq!(
            report.alias_conflicts,
            vec![AliasConflict {
                pwwn: pwwn("10:00:00:00:00:00:00:01"),
                declared_host: "H1".into(),
                existing_alias: "OLD".into(),
            }]
        );
        assert_eq!(report.violation_count(), 1);
    }

    #[test]
    fn alias_with_same_name_is_not_a_conflict() {
        let mut session = ScriptedSession::new(&[
            (
                "show zoneset brief vsan 10",
                "zoneset name ZS vsan 10\n  zone Z1\n".to_string(),
            ),
            (
                "show device-alias database",
                "device-alias name H1 pwwn 10:00:00:00:00:00:00:01\n".to_string(),
            ),
        ]);
        let intent = single_host_intent("H1", "10:00:00:00:00:00:00:01", "Z1");

        let report = run_check(&mut session, &intent, &target(), &CheckOptions::default())
            .expect("complete run");
        assert!(report.is_clean());
        assert_eq!(report.zone_members[0].count, 0);
    }

    #[test]
    fn missing_zone_set_and_zone_are_reported() {
        let mut session = ScriptedSession::new(&[(
            "show zoneset brief vsan 10",
            "zoneset name OTHER vsan 10\n  zone Z_OTHER\n".to_string(),
        )]);
        let intent = single_host_intent("H1", "10:00:00:00:00:00:00:01", "Z1");

        let report = run_check(&mut session, &intent, &target(), &CheckOptions::default())
            .expect("complete run");
        assert_eq!(
            report.missing_zone_sets,
            vec![MissingZoneSet {
                name: "ZS".into(),
                vsan: Vsan::new(10).expect("vsan")
            }]
        );
        assert_eq!(report.missing_zones, vec![MissingZone { name: "Z1".into() }]);
        assert_eq!(report.zone_sets_listed, vec!["OTHER".to_string()]);
    }

    #[test]
    fn substring_zone_set_counts_as_present() {
        let mut session = ScriptedSession::new(&[(
            "show zoneset brief vsan 10",
            "zoneset name ZSX vsan 10\n  zone Z1\nzoneset name ZS vsan 20\n".to_string(),
        )]);
        let intent = single_host_intent("H1", "10:00:00:00:00:00:00:01", "Z1");

        let report = run_check(&mut session, &intent, &target(), &CheckOptions::default())
            .expect("complete run");
        assert!(report.missing_zone_sets.is_empty());
        assert_eq!(report.zone_sets_listed, vec!["ZSX".to_string()]);
    }

    #[test]
    fn transport_failure_returns_partial_report_and_closes() {
        let mut session = ScriptedSession::new(&[(
            "show zoneset brief vsan 10",
            "zoneset name OTHER vsan 10\n".to_string(),
        )]);
        session.fail_on = Some("show device-alias database".to_string());
        let intent = single_host_intent("H1", "10:00:00:00:00:00:00:01", "Z1");

        let failure = run_check(&mut session, &intent, &target(), &CheckOptions::default())
            .expect_err("timeout aborts the run");

        assert_eq!(failure.stage, Stage::DeviceAliasCheck);
        assert!(matches!(failure.error, TransportError::Timeout { .. }));
        assert!(!failure.partial.complete);
        assert_eq!(failure.partial.missing_zone_sets.len(), 1);
        assert!(failure.partial.zone_members.is_empty());
        assert!(session.closed);
        assert_eq!(session.sent.len(), 2);
    }

    #[test]
    fn text_report_lists_violations() {
        let mut session = ScriptedSession::new(&[(
            "show zoneset brief vsan 10",
            "zoneset name ZS vsan 10\n".to_string(),
        )]);
        let intent = single_host_intent("H1", "10:00:00:00:00:00:00:01", "Z1");
        let report = run_check(&mut session, &intent, &target(), &CheckOptions::default())
            .expect("complete run");

        let text = render_validation_text(&report);
        assert!(text.contains("check zoneset ZS vsan 10 complete=true max_members=50"));
        assert!(text.contains("result violations=1 warnings=0"));
        assert!(text.contains("zonesets listed=ZS"));
        assert!(text.contains("- zone Z1 does not exist"));
        assert!(text.contains("- Z1 members=0"));
    }
}
