use uuid::Uuid;

use crate::models::user::User;

pub const AP_SUBJECTS: &[&str] = &[
    "AP Biology",
    "AP Chemistry",
    "AP Physics 1",
    "AP Physics 2",
    "AP Physics C",
    "AP Calculus AB",
    "AP Calculus BC",
    "AP Statistics",
    "AP Computer Science A",
    "AP Computer Science Principles",
    "AP English Language",
    "AP English Literature",
    "AP US History",
    "AP World History",
    "AP European History",
    "AP Government",
    "AP Economics (Macro)",
    "AP Economics (Micro)",
    "AP Psychology",
    "AP Sociology",
    "AP French",
    "AP Spanish",
    "AP German",
    "AP Latin",
    "AP Chinese",
    "AP Art History",
    "AP Studio Art",
    "AP Music Theory",
    "AP Environmental Science",
    "AP Human Geography",
];

pub const SCHOOLS: &[&str] = &["Independence High School", "Liberty High School"];

pub const GRADE_LEVELS: &[&str] = &[
    "9th Grade (Freshman)",
    "10th Grade (Sophomore)",
    "11th Grade (Junior)",
    "12th Grade (Senior)",
];

const PROFILE_FIELD_COUNT: u32 = 9;

pub fn is_known_subject(subject: &str) -> bool {
    AP_SUBJECTS.contains(&subject)
}

pub fn is_known_grade(grade: &str) -> bool {
    GRADE_LEVELS.contains(&grade)
}

/// Percentage of the nine profile fields a user has filled in, rounded down.
pub fn profile_completion(user: &User) -> u8 {
    let is_filled = |field: &str| !field.trim().is_empty();
    let is_some_filled = |field: &Option<String>| field.as_deref().is_some_and(is_filled);

    let filled = [
        is_filled(user.first_name.as_str()),
        is_filled(user.last_name.as_str()),
        is_filled(user.email.as_str()),
        is_filled(user.date_of_birth.as_str()),
        is_some_filled(&user.school),
        is_some_filled(&user.grade),
        is_some_filled(&user.phone_number),
        is_some_filled(&user.discord),
        !user.mentor_subjects.is_empty(),
    ]
    .into_iter()
    .filter(|f| *f)
    .count() as u32;

    (filled * 100 / PROFILE_FIELD_COUNT) as u8
}

#[derive(Clone, Debug)]
pub struct MentorSearchCriteria {
    pub subjects: Vec<String>,
    pub school: Option<String>,
    pub grade: Option<String>,
}

// In-memory mirror of the search query in `db::user`, used to check query results in tests
#[cfg(test)]
impl MentorSearchCriteria {
    pub fn matches(&self, candidate: &User, searcher_id: Uuid) -> bool {
        if candidate.id == searcher_id || !candidate.onboarding_completed {
            return false;
        }

        let teaches_subject = candidate
            .mentor_subjects
            .iter()
            .any(|subject| self.subjects.contains(subject));

        if !teaches_subject {
            return false;
        }

        if let Some(school) = &self.school {
            if candidate.school.as_ref() != Some(school) {
                return false;
            }
        }

        if let Some(grade) = &self.grade {
            if candidate.grade.as_ref() != Some(grade) {
                return false;
            }
        }

        true
    }
}
