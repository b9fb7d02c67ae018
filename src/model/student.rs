use serde::Deserialize;
use std::fmt;

/// A student as uploaded by the bulk importer. Students are never modified
/// afterwards.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, sqlx::FromRow)]
pub struct Student {
    #[serde(rename = "RollNo")]
    pub roll_no: String,
    #[serde(rename = "StudentName")]
    pub student_name: String,
    #[serde(rename = "FatherName")]
    pub father_name: String,
    #[serde(rename = "StudentEmail")]
    pub student_email: String,
    #[serde(rename = "GroupName")]
    pub group_name: String,
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "FatherMobileNo")]
    pub father_mobile: String,
    #[serde(rename = "StudentMobile")]
    pub student_mobile: String,
    #[serde(rename = "ModeNew")]
    pub mode_new: String,
}

impl Student {
    pub const COLUMNS: [&'static str; 9] = [
        "RollNo",
        "StudentName",
        "FatherName",
        "StudentEmail",
        "GroupName",
        "Gender",
        "FatherMobileNo",
        "StudentMobile",
        "ModeNew",
    ];
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} - {}", self.roll_no, self.student_name)
    }
}

/// A student still free to join a team, as offered to the team-creation
/// form.
#[derive(Clone, Debug, Eq, PartialEq, sqlx::FromRow)]
pub struct RosterEntry {
    pub roll_no: String,
    pub student_name: String,
}

impl RosterEntry {
    /// Extract the roll number from a `"roll - name"` label. A bare roll
    /// number is returned unchanged.
    pub fn roll_of(label: &str) -> &str {
        label.split(" - ").next().unwrap_or(label).trim()
    }
}

impl fmt::Display for RosterEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} - {}", self.roll_no, self.student_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label() {
        let entry = RosterEntry {
            roll_no: "CS1-R01".into(),
            student_name: "Ada Lovelace".into(),
        };
        assert_eq!(entry.to_string(), "CS1-R01 - Ada Lovelace");
        assert_eq!(RosterEntry::roll_of(&entry.to_string()), "CS1-R01");
    }

    #[test]
    fn test_roll_of_bare_roll() {
        assert_eq!(RosterEntry::roll_of(" CS1-R02 "), "CS1-R02");
        // Only the first separator counts, names may contain dashes.
        assert_eq!(RosterEntry::roll_of("R7 - Jean - Pierre"), "R7");
    }
}
