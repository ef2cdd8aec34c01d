use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::System;

lazy_static! {
    static ref SECTION_PREFIX: Regex = Regex::new(r"^([A-Za-z][\w.-]*)::").unwrap();
}

/// Distinct `Section::` prefixes of a system's evidence, in first-seen order
pub fn list_sections(system: &System) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut sections = Vec::new();

    for line in system.content.lines() {
        if let Some(caps) = SECTION_PREFIX.captures(line.trim_start()) {
            let name = &caps[1];
            if seen.insert(name.to_string()) {
                sections.push(name.to_string());
            }
        }
    }

    sections
}
