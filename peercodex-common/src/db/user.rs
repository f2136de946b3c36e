use diesel::{
    dsl, BoolExpressionMethods, ExpressionMethods, PgArrayExpressionMethods, QueryDsl,
    RunQueryDsl,
};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::user::{NewUser, ProfileChanges, User, ROLE_STUDENT, ROLE_USER};
use crate::profile::MentorSearchCriteria;
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

const MAX_SEARCH_RESULTS: i64 = 200;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn get_user(&self, user_id: Uuid) -> Result<User, DaoError> {
        Ok(users
            .find(user_id)
            .get_result::<User>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
        date_of_birth: &str,
    ) -> Result<Uuid, DaoError> {
        let user_id = Uuid::now_v7();
        let now = SystemTime::now();
        let email = email.to_ascii_lowercase();

        let new_user = NewUser {
            id: user_id,
            email: &email,
            password_hash,
            is_verified: false,

            first_name,
            last_name,
            date_of_birth,
            role: ROLE_USER,
            onboarding_completed: false,

            mentor_subjects: &[],

            created_timestamp: now,
            modified_timestamp: now,
        };

        dsl::insert_into(users)
            .values(&new_user)
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(user_id)
    }

    /// Returns `false` if the user had already been verified.
    pub fn verify_user_creation(&self, user_id: Uuid) -> Result<bool, DaoError> {
        let updated_count = diesel::update(
            users
                .find(user_id)
                .filter(user_fields::is_verified.eq(false)),
        )
        .set((
            user_fields::is_verified.eq(true),
            user_fields::modified_timestamp.eq(SystemTime::now()),
        ))
        .execute(&mut self.db_thread_pool.get()?)?;

        if updated_count == 0 {
            // Distinguishes a missing user from one that is already verified
            users
                .select(user_fields::id)
                .find(user_id)
                .get_result::<Uuid>(&mut self.db_thread_pool.get()?)?;

            return Ok(false);
        }

        Ok(true)
    }

    pub fn complete_onboarding(
        &self,
        user_id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<User, DaoError> {
        Ok(diesel::update(users.find(user_id))
            .set((
                changes,
                user_fields::role.eq(ROLE_STUDENT),
                user_fields::onboarding_completed.eq(true),
            ))
            .get_result::<User>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn update_profile(
        &self,
        user_id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<User, DaoError> {
        Ok(diesel::update(users.find(user_id))
            .set(changes)
            .get_result::<User>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn search_mentors(
        &self,
        searcher_id: Uuid,
        criteria: &MentorSearchCriteria,
    ) -> Result<Vec<User>, DaoError> {
        let mut query = users
            .filter(user_fields::onboarding_completed.eq(true))
            .filter(user_fields::id.ne(searcher_id))
            .filter(user_fields::mentor_subjects.overlaps_with(&criteria.subjects))
            .into_boxed();

        if let Some(school) = &criteria.school {
            query = query.filter(user_fields::school.eq(school));
        }

        if let Some(grade) = &criteria.grade {
            query = query.filter(user_fields::grade.eq(grade));
        }

        Ok(query
            .order((user_fields::last_name.asc(), user_fields::first_name.asc()))
            .limit(MAX_SEARCH_RESULTS)
            .load::<User>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn delete_user(&self, user_id: Uuid) -> Result<(), DaoError> {
        diesel::delete(users.find(user_id)).execute(&mut self.db_thread_pool.get()?)?;
        Ok(())
    }

    pub fn delete_unverified_users_older_than(&self, max_age: Duration) -> Result<usize, DaoError> {
        let cutoff = SystemTime::now() - max_age;

        Ok(diesel::delete(
            users.filter(
                user_fields::is_verified
                    .eq(false)
                    .and(user_fields::created_timestamp.lt(cutoff)),
            ),
        )
        .execute(&mut self.db_thread_pool.get()?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::db::test_utils;

    #[test]
    #[ignore = "requires a running PostgreSQL database"]
    fn test_create_and_verify_user() {
        let dao = Dao::new(test_utils::db_pool());
        let email = test_utils::unique_email().to_uppercase();

        let user_id = dao
            .create_user(&email, "hash", "Jane", "Doe", "2008-04-02")
            .unwrap();

        let user = dao.get_user(user_id).unwrap();
        assert_eq!(user.email, email.to_ascii_lowercase());
        assert!(!user.is_verified);
        assert!(!user.onboarding_completed);
        assert_eq!(user.role, ROLE_USER);
        assert!(user.mentor_subjects.is_empty());

        assert!(dao.verify_user_creation(user_id).unwrap());
        assert!(!dao.verify_user_creation(user_id).unwrap());
        assert!(dao.verify_user_creation(Uuid::now_v7()).is_err());

        // Same email, different case
        assert!(dao
            .create_user(&email.to_lowercase(), "hash", "Jane", "Doe", "2008-04-02")
            .is_err());

        test_utils::delete_user(user_id);
    }

    #[test]
    #[ignore = "requires a running PostgreSQL database"]
    fn test_search_mentors() {
        let searcher = test_utils::create_onboarded_user(&["AP Biology"]);
        let mentor = test_utils::create_onboarded_user(&["AP Latin", "AP Chinese"]);
        let other = test_utils::create_onboarded_user(&["AP German"]);

        let dao = Dao::new(test_utils::db_pool());

        let criteria = MentorSearchCriteria {
            subjects: vec![String::from("AP Latin"), String::from("AP Biology")],
            school: Some(String::from("Liberty High School")),
            grade: None,
        };

        let results = dao.search_mentors(searcher.id, &criteria).unwrap();
        assert!(results.iter().any(|u| u.id == mentor.id));
        assert!(!results.iter().any(|u| u.id == searcher.id));
        assert!(!results.iter().any(|u| u.id == other.id));
        assert!(results.iter().all(|u| criteria.matches(u, searcher.id)));

        let criteria = MentorSearchCriteria {
            subjects: vec![String::from("AP Latin")],
            school: Some(String::from("Independence High School")),
            grade: None,
        };
        let results = dao.search_mentors(searcher.id, &criteria).unwrap();
        assert!(!results.iter().any(|u| u.id == mentor.id));

        test_utils::delete_user(searcher.id);
        test_utils::delete_user(mentor.id);
        test_utils::delete_user(other.id);
    }

    #[test]
    #[ignore = "requires a running PostgreSQL database"]
    fn test_delete_unverified_users_older_than() {
        let dao = Dao::new(test_utils::db_pool());

        let unverified_id = dao
            .create_user(&test_utils::unique_email(), "hash", "Old", "User", "2008-04-02")
            .unwrap();
        let verified = test_utils::create_onboarded_user(&[]);

        dao.delete_unverified_users_older_than(Duration::ZERO)
            .unwrap();

        assert!(dao.get_user(unverified_id).is_err());
        assert!(dao.get_user(verified.id).is_ok());

        test_utils::delete_user(verified.id);
    }
}
