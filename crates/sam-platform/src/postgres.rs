use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sam_core::{
    AcquiredRight, AcquiredRightsStore, Aggregation, ComplianceReadStore, ConcurrentUser,
    CostCategory, NominativeUser, Product, ProductType, ProductUsersStore, ScopeCost,
};
use sqlx::{PgPool, Row, postgres::PgRow};

/// System-of-record adapter over the license tables.
#[derive(Clone)]
pub struct PgLicenseStore {
    pool: PgPool,
}

impl PgLicenseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn acquired_right_from_row(row: &PgRow) -> Result<AcquiredRight> {
    Ok(AcquiredRight {
        sku: row.try_get("sku")?,
        scope: row.try_get("scope")?,
        swidtag: row.try_get("swidtag")?,
        product_name: row.try_get("product_name")?,
        product_editor: row.try_get("product_editor")?,
        metric: row.try_get("metric")?,
        version: row.try_get("version")?,
        entity: row.try_get("entity")?,
        num_licenses_acquired: row.try_get("num_licenses_acquired")?,
        num_licences_maintenance: row.try_get("num_licences_maintenance")?,
        avg_unit_price: row.try_get("avg_unit_price")?,
        avg_maintenance_unit_price: row.try_get("avg_maintenance_unit_price")?,
        total_purchase_cost: row.try_get("total_purchase_cost")?,
        total_maintenance_cost: row.try_get("total_maintenance_cost")?,
        total_cost: row.try_get("total_cost")?,
        start_of_maintenance: row.try_get("start_of_maintenance")?,
        end_of_maintenance: row.try_get("end_of_maintenance")?,
        created_by: row.try_get("created_by")?,
    })
}

fn concurrent_user_from_row(row: &PgRow) -> Result<ConcurrentUser> {
    Ok(ConcurrentUser {
        id: row.try_get("id")?,
        scope: row.try_get("scope")?,
        is_aggregation: row.try_get("is_aggregation")?,
        aggregation_id: row.try_get("aggregation_id")?,
        swidtag: row.try_get("swidtag")?,
        product_name: row.try_get("product_name")?,
        product_editor: row.try_get("product_editor")?,
        product_version: row.try_get("product_version")?,
        number_of_users: row.try_get("number_of_users")?,
        profile_user: row.try_get("profile_user")?,
        team: row.try_get("team")?,
        purchase_date: row.try_get::<NaiveDate, _>("purchase_date")?,
        created_by: row.try_get("created_by")?,
    })
}

fn nominative_user_from_row(row: &PgRow) -> Result<NominativeUser> {
    Ok(NominativeUser {
        id: row.try_get("id")?,
        scope: row.try_get("scope")?,
        aggregation_id: row.try_get("aggregation_id")?,
        swidtag: row.try_get("swidtag")?,
        user_name: row.try_get("user_name")?,
        first_name: row.try_get("first_name")?,
        email: row.try_get("email")?,
        profile: row.try_get("profile")?,
        activation_date: row.try_get("activation_date")?,
        created_by: row.try_get("created_by")?,
    })
}

fn parse_product_type(raw: &str) -> ProductType {
    match raw {
        "SAAS" => ProductType::Saas,
        _ => ProductType::OnPremise,
    }
}

#[async_trait]
impl AcquiredRightsStore for PgLicenseStore {
    async fn get_acquired_right(&self, scope: &str, sku: &str) -> Result<Option<AcquiredRight>> {
        let row = sqlx::query(
            r#"
            SELECT sku, scope, swidtag, product_name, product_editor, metric, version, entity,
                   num_licenses_acquired, num_licences_maintenance, avg_unit_price,
                   avg_maintenance_unit_price, total_purchase_cost, total_maintenance_cost,
                   total_cost, start_of_maintenance, end_of_maintenance, created_by
            FROM acqrights
            WHERE scope = $1 AND sku = $2
            "#,
        )
        .bind(scope)
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(acquired_right_from_row).transpose()
    }

    async fn upsert_acquired_right(&self, right: &AcquiredRight) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO acqrights (
                sku, scope, swidtag, product_name, product_editor, metric, version, entity,
                num_licenses_acquired, num_licences_maintenance, avg_unit_price,
                avg_maintenance_unit_price, total_purchase_cost, total_maintenance_cost,
                total_cost, start_of_maintenance, end_of_maintenance, created_by, updated_on
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            ON CONFLICT (sku, scope) DO UPDATE SET
                swidtag = EXCLUDED.swidtag,
                product_name = EXCLUDED.product_name,
                product_editor = EXCLUDED.product_editor,
                metric = EXCLUDED.metric,
                version = EXCLUDED.version,
                entity = EXCLUDED.entity,
                num_licenses_acquired = EXCLUDED.num_licenses_acquired,
                num_licences_maintenance = EXCLUDED.num_licences_maintenance,
                avg_unit_price = EXCLUDED.avg_unit_price,
                avg_maintenance_unit_price = EXCLUDED.avg_maintenance_unit_price,
                total_purchase_cost = EXCLUDED.total_purchase_cost,
                total_maintenance_cost = EXCLUDED.total_maintenance_cost,
                total_cost = EXCLUDED.total_cost,
                start_of_maintenance = EXCLUDED.start_of_maintenance,
                end_of_maintenance = EXCLUDED.end_of_maintenance,
                updated_on = EXCLUDED.updated_on
            "#,
        )
        .bind(&right.sku)
        .bind(&right.scope)
        .bind(&right.swidtag)
        .bind(&right.product_name)
        .bind(&right.product_editor)
        .bind(&right.metric)
        .bind(&right.version)
        .bind(&right.entity)
        .bind(right.num_licenses_acquired)
        .bind(right.num_licences_maintenance)
        .bind(right.avg_unit_price)
        .bind(right.avg_maintenance_unit_price)
        .bind(right.total_purchase_cost)
        .bind(right.total_maintenance_cost)
        .bind(right.total_cost)
        .bind(right.start_of_maintenance)
        .bind(right.end_of_maintenance)
        .bind(&right.created_by)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to upsert acquired right {}", right.sku))?;

        Ok(())
    }

    async fn delete_acquired_right(&self, scope: &str, sku: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM acqrights WHERE scope = $1 AND sku = $2")
            .bind(scope)
            .bind(sku)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProductUsersStore for PgLicenseStore {
    async fn get_aggregation(&self, scope: &str, id: i32) -> Result<Option<Aggregation>> {
        let row = sqlx::query(
            "SELECT id, scope, aggregation_name, product_editor FROM aggregations WHERE scope = $1 AND id = $2",
        )
        .bind(scope)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok::<_, anyhow::Error>(Aggregation {
                id: row.try_get("id")?,
                scope: row.try_get("scope")?,
                name: row.try_get("aggregation_name")?,
                editor: row.try_get("product_editor")?,
            })
        })
        .transpose()
    }

    async fn get_product(&self, scope: &str, swidtag: &str) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT scope, swidtag, product_name, product_editor, product_version, product_type, created_by
            FROM products
            WHERE scope = $1 AND swidtag = $2
            "#,
        )
        .bind(scope)
        .bind(swidtag)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok::<_, anyhow::Error>(Product {
                scope: row.try_get("scope")?,
                swidtag: row.try_get("swidtag")?,
                name: row.try_get("product_name")?,
                editor: row.try_get("product_editor")?,
                version: row.try_get("product_version")?,
                product_type: parse_product_type(&row.try_get::<String, _>("product_type")?),
                created_by: row.try_get("created_by")?,
            })
        })
        .transpose()
    }

    async fn upsert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (
                scope, swidtag, product_name, product_editor, product_version, product_type,
                created_by, created_on
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (swidtag, scope) DO UPDATE SET
                product_name = EXCLUDED.product_name,
                product_editor = EXCLUDED.product_editor,
                product_version = EXCLUDED.product_version,
                product_type = EXCLUDED.product_type
            "#,
        )
        .bind(&product.scope)
        .bind(&product.swidtag)
        .bind(&product.name)
        .bind(&product.editor)
        .bind(&product.version)
        .bind(product.product_type.as_str())
        .bind(&product.created_by)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_concurrent_user(&self, user: &ConcurrentUser) -> Result<i32> {
        let id = if user.id > 0 {
            sqlx::query_scalar::<_, i32>(
                r#"
                UPDATE product_concurrent_user SET
                    is_aggregation = $3, aggregation_id = $4, swidtag = $5, product_name = $6,
                    product_editor = $7, product_version = $8, number_of_users = $9,
                    profile_user = $10, team = $11, purchase_date = $12, updated_by = $13,
                    updated_on = $14
                WHERE scope = $1 AND id = $2
                RETURNING id
                "#,
            )
            .bind(&user.scope)
            .bind(user.id)
            .bind(user.is_aggregation)
            .bind(user.aggregation_id)
            .bind(&user.swidtag)
            .bind(&user.product_name)
            .bind(&user.product_editor)
            .bind(&user.product_version)
            .bind(user.number_of_users)
            .bind(&user.profile_user)
            .bind(&user.team)
            .bind(user.purchase_date)
            .bind(&user.created_by)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .with_context(|| format!("concurrent user {} not found", user.id))?
        } else {
            sqlx::query_scalar::<_, i32>(
                r#"
                INSERT INTO product_concurrent_user (
                    scope, is_aggregation, aggregation_id, swidtag, product_name, product_editor,
                    product_version, number_of_users, profile_user, team, purchase_date,
                    created_by, created_on
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                RETURNING id
                "#,
            )
            .bind(&user.scope)
            .bind(user.is_aggregation)
            .bind(user.aggregation_id)
            .bind(&user.swidtag)
            .bind(&user.product_name)
            .bind(&user.product_editor)
            .bind(&user.product_version)
            .bind(user.number_of_users)
            .bind(&user.profile_user)
            .bind(&user.team)
            .bind(user.purchase_date)
            .bind(&user.created_by)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?
        };

        Ok(id)
    }

    async fn get_concurrent_user(&self, scope: &str, id: i32) -> Result<Option<ConcurrentUser>> {
        let row = sqlx::query(
            r#"
            SELECT id, scope, is_aggregation, aggregation_id, swidtag, product_name,
                   product_editor, product_version, number_of_users, profile_user, team,
                   purchase_date, created_by
            FROM product_concurrent_user
            WHERE scope = $1 AND id = $2
            "#,
        )
        .bind(scope)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(concurrent_user_from_row).transpose()
    }

    async fn delete_concurrent_user(&self, scope: &str, id: i32) -> Result<()> {
        sqlx::query("DELETE FROM product_concurrent_user WHERE scope = $1 AND id = $2")
            .bind(scope)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn upsert_nominative_users(&self, users: &[NominativeUser]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for user in users {
            sqlx::query(
                r#"
                INSERT INTO nominative_user (
                    scope, aggregation_id, swidtag, user_name, first_name, email, profile,
                    activation_date, created_by, created_on
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (scope, swidtag, aggregation_id, email, profile) DO UPDATE SET
                    user_name = EXCLUDED.user_name,
                    first_name = EXCLUDED.first_name,
                    activation_date = EXCLUDED.activation_date,
                    updated_by = EXCLUDED.created_by,
                    updated_on = EXCLUDED.created_on
                "#,
            )
            .bind(&user.scope)
            .bind(user.aggregation_id)
            .bind(&user.swidtag)
            .bind(&user.user_name)
            .bind(&user.first_name)
            .bind(&user.email)
            .bind(&user.profile)
            .bind(user.activation_date)
            .bind(&user.created_by)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to upsert nominative user {}", user.email))?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_nominative_user(&self, scope: &str, id: i32) -> Result<Option<NominativeUser>> {
        let row = sqlx::query(
            r#"
            SELECT id, scope, aggregation_id, swidtag, user_name, first_name, email, profile,
                   activation_date, created_by
            FROM nominative_user
            WHERE scope = $1 AND id = $2
            "#,
        )
        .bind(scope)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(nominative_user_from_row).transpose()
    }

    async fn delete_nominative_user(&self, scope: &str, id: i32) -> Result<()> {
        sqlx::query("DELETE FROM nominative_user WHERE scope = $1 AND id = $2")
            .bind(scope)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn count_product_users(&self, scope: &str, swidtag: &str) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM product_concurrent_user WHERE scope = $1 AND swidtag = $2)
              + (SELECT COUNT(*) FROM nominative_user WHERE scope = $1 AND swidtag = $2)
            "#,
        )
        .bind(scope)
        .bind(swidtag)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn delete_product(&self, scope: &str, swidtag: &str) -> Result<()> {
        sqlx::query("DELETE FROM products WHERE scope = $1 AND swidtag = $2")
            .bind(scope)
            .bind(swidtag)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl ComplianceReadStore for PgLicenseStore {
    async fn scope_costs(
        &self,
        category: CostCategory,
        scopes: &[String],
        editor: &str,
    ) -> Result<Vec<ScopeCost>> {
        let sql = match category {
            CostCategory::Counterfeiting => {
                r#"
                SELECT scope, COALESCE(SUM(ABS(delta_cost)), 0)::numeric AS cost
                FROM overall_computed_licences
                WHERE scope = ANY($1) AND editor = $2 AND delta_cost < 0
                GROUP BY scope
                "#
            }
            CostCategory::UnderUsage => {
                r#"
                SELECT scope, COALESCE(SUM(delta_cost), 0)::numeric AS cost
                FROM overall_computed_licences
                WHERE scope = ANY($1) AND editor = $2 AND delta_cost > 0
                GROUP BY scope
                "#
            }
            CostCategory::Total => {
                r#"
                SELECT scope, COALESCE(SUM(total_cost), 0)::numeric AS cost
                FROM acqrights
                WHERE scope = ANY($1) AND product_editor = $2
                GROUP BY scope
                "#
            }
        };

        let rows = sqlx::query(sql)
            .bind(scopes)
            .bind(editor)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("{} cost query failed", category.as_str()))?;

        rows.iter()
            .map(|row| {
                Ok::<_, anyhow::Error>(ScopeCost {
                    scope: row.try_get("scope")?,
                    cost: row.try_get::<Decimal, _>("cost")?,
                })
            })
            .collect()
    }
}
