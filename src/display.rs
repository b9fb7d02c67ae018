use crate::checks::DoubleBooking;
use crate::import::ImportReport;
use crate::model::{RosterEntry, Student, Team};

pub fn display_groups(groups: &[String]) {
    if groups.is_empty() {
        println!("No groups found in database.");
        return;
    }
    println!("Groups:");
    for g in groups {
        println!("  - {g}");
    }
}

pub fn display_roster(group: &str, roster: &[RosterEntry]) {
    if roster.is_empty() {
        println!("All students of {group} already assigned.");
        return;
    }
    println!("Available students of {group}: {}", roster.len());
    for entry in roster {
        println!("  - {entry}");
    }
}

pub fn display_students(students: &[Student]) {
    if students.is_empty() {
        println!("No student records found.");
        return;
    }
    let mut group = None;
    for s in students {
        if group != Some(&s.group_name) {
            println!("{}:", s.group_name);
            group = Some(&s.group_name);
        }
        println!(
            "  - {s} ({}, {}, {}, {})",
            s.student_email, s.gender, s.student_mobile, s.mode_new
        );
    }
    println!("Total students: {}", students.len());
}

pub fn display_teams(teams: &[Team]) {
    if teams.is_empty() {
        println!("No teams registered.");
        return;
    }
    for team in teams {
        println!("{team}:");
        println!("  Project: {}", team.project_title);
        println!("  Members: {}", team.member_rolls.join(", "));
        println!("  Created at: {}", team.created_at.format("%Y-%m-%d %H:%M:%S"));
        println!();
    }
    println!("Teams: {}", teams.len());
}

pub fn display_import(report: &ImportReport) {
    println!(
        "Students inserted/skipped/blank/total: {}/{}/{}/{}",
        report.inserted,
        report.skipped,
        report.blank,
        report.inserted + report.skipped + report.blank
    );
}

pub fn display_double_bookings(found: &[DoubleBooking]) {
    if found.is_empty() {
        println!("No student belongs to more than one team.");
        return;
    }
    println!("Students in several teams:");
    for b in found {
        let teams = b
            .teams
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        println!("  - {} ({}): teams {}", b.roll_no, b.group_name, teams);
    }
}
