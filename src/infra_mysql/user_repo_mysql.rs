use super::util::store_err;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::types::Json;
use sqlx::{MySql, MySqlPool, QueryBuilder, Row};

const USER_COLUMNS: &str = "user_id, first_name, last_name, email, phone, password_hash, image, \
date_of_birth, preferences, refresh_token_hash, created_at, updated_at";

pub struct MySqlUserRepo {
    pool: MySqlPool,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }

    fn row_to_user(row: MySqlRow) -> Result<User, RepoError> {
        let preferences: Json<Vec<Category>> = row.try_get("preferences").map_err(store_err)?;
        let date_of_birth: NaiveDate = row.try_get("date_of_birth").map_err(store_err)?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(store_err)?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(store_err)?;

        Ok(User {
            id: row.try_get("user_id").map_err(store_err)?,
            first_name: row.try_get("first_name").map_err(store_err)?,
            last_name: row.try_get("last_name").map_err(store_err)?,
            email: row.try_get("email").map_err(store_err)?,
            phone: row.try_get("phone").map_err(store_err)?,
            password_hash: row.try_get("password_hash").map_err(store_err)?,
            image: row.try_get("image").map_err(store_err)?,
            date_of_birth,
            preferences: preferences.0,
            created_at,
            updated_at,
            refresh_token_hash: row.try_get("refresh_token_hash").map_err(store_err)?,
        })
    }

    async fn fetch_one_where(
        &self,
        condition: &str,
        bind: &str,
    ) -> Result<Option<User>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {condition} LIMIT 1");
        sqlx::query(&sql)
            .bind(bind)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .map(Self::row_to_user)
            .transpose()
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn create(&self, user: &User) -> Result<(), RepoError> {
        sqlx::query(
            r#"
INSERT INTO users (user_id, first_name, last_name, email, phone, password_hash, image,
                   date_of_birth, preferences, refresh_token_hash, created_at, updated_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(&user.image)
        .bind(user.date_of_birth)
        .bind(Json(&user.preferences))
        .bind(&user.refresh_token_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<User>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?");
        sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .map(Self::row_to_user)
            .transpose()
    }

    async fn get_by_identifier(&self, identifier: &str) -> Result<Option<User>, RepoError> {
        if identifier.contains('@') {
            self.fetch_one_where("email = ?", identifier).await
        } else {
            self.fetch_one_where("phone = ?", identifier).await
        }
    }

    async fn find_conflict(
        &self,
        email: &str,
        phone: &str,
        exclude: Option<UserId>,
    ) -> Result<Option<UniqueField>, RepoError> {
        let rows = sqlx::query(
            r#"
SELECT email, phone
FROM users
WHERE (email = ? OR phone = ?) AND (? IS NULL OR user_id <> ?)
"#,
        )
        .bind(email)
        .bind(phone)
        .bind(exclude)
        .bind(exclude)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let taken = |column: &str, value: &str| {
            rows.iter()
                .any(|r| r.try_get::<String, _>(column).is_ok_and(|v| v == value))
        };
        if taken("email", email) {
            return Ok(Some(UniqueField::Email));
        }
        if taken("phone", phone) {
            return Ok(Some(UniqueField::Phone));
        }
        Ok(None)
    }

    async fn update_profile(&self, user: &User) -> Result<(), RepoError> {
        sqlx::query(
            r#"
UPDATE users
SET first_name = ?, last_name = ?, email = ?, phone = ?, password_hash = ?, image = ?,
    preferences = ?, updated_at = ?
WHERE user_id = ?
"#,
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(&user.image)
        .bind(Json(&user.preferences))
        .bind(user.updated_at)
        .bind(user.id)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn id_exists(&self, user_id: UserId) -> Result<bool, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;

        Ok(count > 0)
    }

    async fn get_authors(&self, ids: &[UserId]) -> Result<Vec<Author>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<MySql>::new(
            "SELECT user_id, first_name, last_name FROM users WHERE user_id IN (",
        );
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        rows.into_iter()
            .map(|row| {
                Ok(Author {
                    id: row.try_get("user_id").map_err(store_err)?,
                    first_name: row.try_get("first_name").map_err(store_err)?,
                    last_name: row.try_get("last_name").map_err(store_err)?,
                })
            })
            .collect()
    }

    async fn set_refresh_token(
        &self,
        user_id: UserId,
        token_hash: Option<&str>,
    ) -> Result<bool, RepoError> {
        // an unchanged value may report zero affected rows
        let result = sqlx::query("UPDATE users SET refresh_token_hash = ? WHERE user_id = ?")
            .bind(token_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        if result.rows_affected() > 0 {
            return Ok(true);
        }
        self.id_exists(user_id).await
    }

    async fn replace_refresh_token(
        &self,
        user_id: UserId,
        expected_hash: &str,
        new_hash: &str,
    ) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
UPDATE users
SET refresh_token_hash = ?
WHERE user_id = ? AND refresh_token_hash = ?
"#,
        )
        .bind(new_hash)
        .bind(user_id)
        .bind(expected_hash)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(result.rows_affected() == 1)
    }
}
