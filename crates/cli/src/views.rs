//! Presentation helpers: grouping, selection defaults, and plain-text tables.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use portal_api::dto::DEFAULT_CATEGORY;
use portal_api::{ClassroomDto, ResourceDto};
use portal_auth::SessionSnapshot;
use portal_core::{ClassroomId, GradeId};

/// Resource categories offered when uploading.
pub const CATEGORIES: [&str; 3] = [DEFAULT_CATEGORY, "Revision", "Class work"];

/// Canonical spelling of a category, matched case-insensitively.
pub fn normalize_category(input: &str) -> Option<&'static str> {
    let input = input.trim();
    CATEGORIES
        .into_iter()
        .find(|c| c.eq_ignore_ascii_case(input))
}

/// Classrooms of one grade, in API order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeGroup<'a> {
    pub grade: GradeId,
    pub classrooms: Vec<&'a ClassroomDto>,
}

/// Group classrooms by grade, lowest grade first.
pub fn group_by_grade(items: &[ClassroomDto]) -> Vec<GradeGroup<'_>> {
    let mut groups: BTreeMap<GradeId, Vec<&ClassroomDto>> = BTreeMap::new();
    for item in items {
        groups.entry(item.grade_id).or_default().push(item);
    }
    groups
        .into_iter()
        .map(|(grade, classrooms)| GradeGroup { grade, classrooms })
        .collect()
}

/// Grade selected when the classroom view opens.
pub fn default_grade(items: &[ClassroomDto]) -> Option<GradeId> {
    items.iter().map(|c| c.grade_id).min()
}

/// Classroom whose resources are shown: the requested one when it exists,
/// otherwise the first classroom.
pub fn select_classroom(items: &[ClassroomDto], requested: Option<ClassroomId>) -> Option<ClassroomId> {
    requested
        .filter(|id| items.iter().any(|c| c.id == *id))
        .or_else(|| items.first().map(|c| c.id))
}

pub fn resources_in_category<'a>(items: &'a [ResourceDto], category: &str) -> Vec<&'a ResourceDto> {
    items
        .iter()
        .filter(|r| r.category_or_default().eq_ignore_ascii_case(category))
        .collect()
}

/// Badge shown next to the logout button. `None` when logged out.
pub fn role_badge(session: &SessionSnapshot) -> Option<&str> {
    if !session.authenticated {
        return None;
    }
    Some(session.roles.first().map(|r| r.as_str()).unwrap_or("User"))
}

pub fn render_classrooms(groups: &[GradeGroup<'_>]) -> String {
    if groups.is_empty() {
        return "No classrooms yet.\n".to_string();
    }

    let mut out = String::new();
    for group in groups {
        let _ = writeln!(out, "Grade {}", group.grade);
        for c in &group.classrooms {
            let _ = writeln!(
                out,
                "  #{:<6} {:<32} subject {:<4} teacher {}",
                c.id, c.name, c.subject_id, c.teacher_user_id
            );
        }
    }
    out
}

pub fn render_resources(items: &[&ResourceDto]) -> String {
    if items.is_empty() {
        return "No resources in this classroom yet.\n".to_string();
    }

    let mut out = String::new();
    for r in items {
        let uploaded = r
            .uploaded_at_utc()
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| r.uploaded_at.clone());
        let _ = writeln!(
            out,
            "#{:<6} {:<40} {:<12} {}",
            r.id,
            r.file_name,
            r.category_or_default(),
            uploaded
        );
    }
    out
}
