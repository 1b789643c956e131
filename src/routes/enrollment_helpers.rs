use diesel::prelude::*;

use crate::error::AppResult;
use crate::model::{CourseStudent, UserEnrollment};
use crate::schema::{course_students, user_enrollments};

/// Which sides of the enrollment relation a call actually wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollmentOutcome {
    pub user_side_added: bool,
    pub course_side_added: bool,
}

impl EnrollmentOutcome {
    pub fn is_noop(&self) -> bool {
        !self.user_side_added && !self.course_side_added
    }
}

/// Add the course to the user's enrolled list and the user to the course's students.
///
/// Both writes are `INSERT OR IGNORE` against a composite primary key, so replays and
/// retries after a one-sided write converge on exactly one row per side.
pub fn record_enrollment(
    conn: &mut SqliteConnection,
    user_id_param: &str,
    course_id_param: &str,
) -> AppResult<EnrollmentOutcome> {
    let now = chrono::Utc::now().naive_utc();

    let user_rows = diesel::insert_or_ignore_into(user_enrollments::table)
        .values(&UserEnrollment {
            user_id: user_id_param.to_string(),
            course_id: course_id_param.to_string(),
            enrolled_at: now,
        })
        .execute(conn)?;

    let course_rows = diesel::insert_or_ignore_into(course_students::table)
        .values(&CourseStudent {
            course_id: course_id_param.to_string(),
            user_id: user_id_param.to_string(),
            added_at: now,
        })
        .execute(conn)?;

    let outcome = EnrollmentOutcome {
        user_side_added: user_rows > 0,
        course_side_added: course_rows > 0,
    };

    if !outcome.is_noop() {
        tracing::info!(
            user_id = user_id_param,
            course_id = course_id_param,
            user_side_added = outcome.user_side_added,
            course_side_added = outcome.course_side_added,
            "Recorded enrollment"
        );
    }

    Ok(outcome)
}

pub fn is_enrolled(
    conn: &mut SqliteConnection,
    user_id_param: &str,
    course_id_param: &str,
) -> AppResult<bool> {
    use crate::schema::user_enrollments::dsl::*;

    let found = diesel::select(diesel::dsl::exists(
        user_enrollments
            .filter(user_id.eq(user_id_param))
            .filter(course_id.eq(course_id_param)),
    ))
    .get_result::<bool>(conn)?;

    Ok(found)
}
