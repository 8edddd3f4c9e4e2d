use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Identifier of a configured national grading system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemId {
    Csee,
    Acsee,
    Plse,
    Nacte,
}

impl SystemId {
    pub const ALL: [SystemId; 4] = [
        SystemId::Csee,
        SystemId::Acsee,
        SystemId::Plse,
        SystemId::Nacte,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SystemId::Csee => "csee",
            SystemId::Acsee => "acsee",
            SystemId::Plse => "plse",
            SystemId::Nacte => "nacte",
        }
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csee" => Ok(SystemId::Csee),
            "acsee" => Ok(SystemId::Acsee),
            "plse" => Ok(SystemId::Plse),
            "nacte" => Ok(SystemId::Nacte),
            other => Err(format!("unknown grading system: {}", other)),
        }
    }
}

/// One contiguous band of the mark scale. Bounds are inclusive on both ends.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBand {
    pub grade: &'static str,
    pub min: f64,
    pub max: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
    pub description: &'static str,
}

/// Cumulative-point cap mapped to a division label, in ascending cap order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DivisionStep {
    pub max_points: f64,
    pub label: &'static str,
}

/// How a student's overall PASS/FAIL status is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Division 0 means FAIL, anything else PASS (CSEE).
    Division,
    /// Division over the principal subjects only; requires at least 2
    /// attended principals and at least 2 principal passes (ACSEE).
    PrincipalDivision,
    /// FAIL when more than `max_fail_fraction` of attended subjects are
    /// failed (PLSE, NACTE). No division concept.
    FailFraction,
}

#[derive(Debug, Clone)]
pub struct GradingSystem {
    pub id: SystemId,
    pub name: &'static str,
    pub bands: Vec<GradeBand>,
    pub passing: Vec<&'static str>,
    pub divisions: Vec<DivisionStep>,
    /// Label when the point sum exceeds every division cap.
    pub fail_division: &'static str,
    pub principal_count: usize,
    pub status_policy: StatusPolicy,
    pub max_fail_fraction: f64,
    /// NACTE reports mean points (GPA) instead of a point sum.
    pub gpa: bool,
}

impl GradingSystem {
    pub fn is_passing(&self, grade: &str) -> bool {
        self.passing.iter().any(|g| *g == grade)
    }

    /// Bands are declared highest-first with integer bounds; fractional
    /// marks between two bounds (80.5 when A starts at 81) belong to the
    /// band below, so lookup is by descending minimum.
    pub fn band_for(&self, mark: f64) -> Option<&GradeBand> {
        if !(0.0..=100.0).contains(&mark) {
            return None;
        }
        self.bands.iter().find(|b| mark >= b.min)
    }

    pub fn has_divisions(&self) -> bool {
        !self.divisions.is_empty()
    }

    pub fn division_for(&self, point_sum: f64) -> &'static str {
        for step in &self.divisions {
            if point_sum <= step.max_points {
                return step.label;
            }
        }
        self.fail_division
    }
}

/// All configured systems, validated once at startup and read-only after.
#[derive(Debug, Clone)]
pub struct RuleBook {
    systems: Vec<GradingSystem>,
}

impl RuleBook {
    pub fn load() -> anyhow::Result<RuleBook> {
        let systems = vec![csee(), acsee(), plse(), nacte()];
        for system in &systems {
            validate_system(system)?;
        }
        Ok(RuleBook { systems })
    }

    pub fn get(&self, id: SystemId) -> &GradingSystem {
        // Load() always builds every variant; the scan cannot miss.
        self.systems
            .iter()
            .find(|s| s.id == id)
            .unwrap_or(&self.systems[0])
    }

    pub fn systems(&self) -> &[GradingSystem] {
        &self.systems
    }
}

fn csee() -> GradingSystem {
    GradingSystem {
        id: SystemId::Csee,
        name: "CSEE",
        bands: vec![
            band("A", 81.0, 100.0, Some(1.0), "Excellent"),
            band("B", 61.0, 80.0, Some(2.0), "Very Good"),
            band("C", 41.0, 60.0, Some(3.0), "Good"),
            band("D", 21.0, 40.0, Some(4.0), "Satisfactory"),
            band("F", 0.0, 20.0, Some(5.0), "Fail"),
        ],
        passing: vec!["A", "B", "C", "D"],
        divisions: vec![
            step(17.0, "I"),
            step(21.0, "II"),
            step(25.0, "III"),
            step(35.0, "IV"),
        ],
        fail_division: "0",
        principal_count: 0,
        status_policy: StatusPolicy::Division,
        max_fail_fraction: 0.0,
        gpa: false,
    }
}

fn acsee() -> GradingSystem {
    GradingSystem {
        id: SystemId::Acsee,
        name: "ACSEE",
        bands: vec![
            band("A", 80.0, 100.0, Some(1.0), "Excellent"),
            band("B", 70.0, 79.0, Some(2.0), "Very Good"),
            band("C", 60.0, 69.0, Some(3.0), "Good"),
            band("D", 50.0, 59.0, Some(4.0), "Average"),
            band("E", 40.0, 49.0, Some(5.0), "Satisfactory"),
            band("S", 35.0, 39.0, Some(6.0), "Subsidiary"),
            band("F", 0.0, 34.0, Some(7.0), "Fail"),
        ],
        passing: vec!["A", "B", "C", "D", "E"],
        divisions: vec![
            step(9.0, "I"),
            step(12.0, "II"),
            step(17.0, "III"),
            step(19.0, "IV"),
        ],
        fail_division: "0",
        principal_count: 3,
        status_policy: StatusPolicy::PrincipalDivision,
        max_fail_fraction: 0.0,
        gpa: false,
    }
}

fn plse() -> GradingSystem {
    GradingSystem {
        id: SystemId::Plse,
        name: "PLSE",
        bands: vec![
            band("A", 80.0, 100.0, None, "Excellent"),
            band("B", 60.0, 79.0, None, "Very Good"),
            band("C", 40.0, 59.0, None, "Good"),
            band("D", 20.0, 39.0, None, "Satisfactory"),
            band("E", 0.0, 19.0, None, "Weak"),
        ],
        passing: vec!["A", "B", "C", "D"],
        divisions: Vec::new(),
        fail_division: "0",
        principal_count: 0,
        status_policy: StatusPolicy::FailFraction,
        max_fail_fraction: 0.4,
        gpa: false,
    }
}

fn nacte() -> GradingSystem {
    GradingSystem {
        id: SystemId::Nacte,
        name: "NACTE",
        bands: vec![
            band("A", 75.0, 100.0, Some(4.0), "Excellent"),
            band("B+", 70.0, 74.0, Some(3.5), "Very Good"),
            band("B", 65.0, 69.0, Some(3.0), "Good"),
            band("C", 60.0, 64.0, Some(2.5), "Above Average"),
            band("D", 50.0, 59.0, Some(2.0), "Average"),
            band("F", 0.0, 49.0, Some(0.0), "Fail"),
        ],
        passing: vec!["A", "B+", "B", "C", "D"],
        divisions: Vec::new(),
        fail_division: "0",
        principal_count: 0,
        status_policy: StatusPolicy::FailFraction,
        max_fail_fraction: 0.4,
        gpa: true,
    }
}

fn band(
    grade: &'static str,
    min: f64,
    max: f64,
    points: Option<f64>,
    description: &'static str,
) -> GradeBand {
    GradeBand {
        grade,
        min,
        max,
        points,
        description,
    }
}

fn step(max_points: f64, label: &'static str) -> DivisionStep {
    DivisionStep { max_points, label }
}

/// Bands must cover every mark in [0,100] exactly once, run highest-first
/// with contiguous integer bounds, passing grades must exist in the band
/// table, and division caps must ascend strictly.
fn validate_system(system: &GradingSystem) -> anyhow::Result<()> {
    for pair in system.bands.windows(2) {
        if pair[1].max + 1.0 != pair[0].min {
            anyhow::bail!(
                "{}: bands must descend contiguously ({} to {})",
                system.name,
                pair[0].grade,
                pair[1].grade
            );
        }
    }
    for mark in 0..=100u32 {
        let m = mark as f64;
        let hits = system
            .bands
            .iter()
            .filter(|b| m >= b.min && m <= b.max)
            .count();
        if hits == 0 {
            anyhow::bail!("{}: no grade band covers mark {}", system.name, mark);
        }
        if hits > 1 {
            anyhow::bail!("{}: overlapping grade bands at mark {}", system.name, mark);
        }
    }
    for grade in &system.passing {
        if !system.bands.iter().any(|b| b.grade == *grade) {
            anyhow::bail!("{}: passing grade {} has no band", system.name, grade);
        }
    }
    let mut prev = f64::NEG_INFINITY;
    for d in &system.divisions {
        if d.max_points <= prev {
            anyhow::bail!("{}: division caps must ascend", system.name);
        }
        prev = d.max_points;
    }
    if system.status_policy == StatusPolicy::FailFraction
        && !(0.0..=1.0).contains(&system.max_fail_fraction)
    {
        anyhow::bail!("{}: max_fail_fraction out of range", system.name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_systems_load_and_validate() {
        let book = RuleBook::load().expect("rule book");
        assert_eq!(book.systems().len(), 4);
    }

    #[test]
    fn bands_partition_full_range_for_every_system() {
        let book = RuleBook::load().expect("rule book");
        for system in book.systems() {
            for mark in 0..=100u32 {
                let hits = system
                    .bands
                    .iter()
                    .filter(|b| (mark as f64) >= b.min && (mark as f64) <= b.max)
                    .count();
                assert_eq!(hits, 1, "{} mark {}", system.name, mark);
            }
        }
    }

    #[test]
    fn csee_band_edges() {
        let book = RuleBook::load().expect("rule book");
        let csee = book.get(SystemId::Csee);
        assert_eq!(csee.band_for(81.0).map(|b| b.grade), Some("A"));
        assert_eq!(csee.band_for(100.0).map(|b| b.grade), Some("A"));
        assert_eq!(csee.band_for(80.0).map(|b| b.grade), Some("B"));
        assert_eq!(csee.band_for(20.0).map(|b| b.grade), Some("F"));
        assert_eq!(csee.band_for(0.0).map(|b| b.grade), Some("F"));
        assert!(csee.band_for(101.0).is_none());
        assert!(csee.band_for(-1.0).is_none());
    }

    #[test]
    fn csee_division_thresholds() {
        let book = RuleBook::load().expect("rule book");
        let csee = book.get(SystemId::Csee);
        assert_eq!(csee.division_for(7.0), "I");
        assert_eq!(csee.division_for(17.0), "I");
        assert_eq!(csee.division_for(18.0), "II");
        assert_eq!(csee.division_for(21.0), "II");
        assert_eq!(csee.division_for(25.0), "III");
        assert_eq!(csee.division_for(35.0), "IV");
        assert_eq!(csee.division_for(36.0), "0");
    }

    #[test]
    fn unknown_system_id_is_rejected() {
        assert!("kcse".parse::<SystemId>().is_err());
        assert!("".parse::<SystemId>().is_err());
        assert_eq!("CSEE".parse::<SystemId>(), Ok(SystemId::Csee));
        assert_eq!(" acsee ".parse::<SystemId>(), Ok(SystemId::Acsee));
    }

    #[test]
    fn plse_bands_carry_no_points() {
        let book = RuleBook::load().expect("rule book");
        let plse = book.get(SystemId::Plse);
        assert!(plse.bands.iter().all(|b| b.points.is_none()));
        assert!(!plse.has_divisions());
    }

    #[test]
    fn validation_rejects_gapped_bands() {
        let mut broken = csee();
        broken.bands.remove(2); // drop C, leaving 41..=60 uncovered
        assert!(validate_system(&broken).is_err());
    }

    #[test]
    fn validation_rejects_overlapping_bands() {
        let mut broken = plse();
        broken.bands.push(band("X", 50.0, 70.0, None, "Overlap"));
        assert!(validate_system(&broken).is_err());
    }
}
