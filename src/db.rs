use anyhow::Context;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::info;

use crate::archetype::Archetype;
use crate::dataset::Dataset;
use crate::models::{CorrelationMap, StudentRecord};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ImportCounts {
    pub students: usize,
    pub engagement: usize,
    pub template_entries: usize,
    pub correlations: usize,
}

/// Replace the mirrored artifacts with `dataset`, atomically.
pub async fn import_dataset(pool: &PgPool, dataset: &Dataset) -> anyhow::Result<ImportCounts> {
    let mut tx = pool.begin().await?;
    let mut counts = ImportCounts::default();

    for table in [
        "skill_gap.engagement",
        "skill_gap.success_templates",
        "skill_gap.activity_correlations",
        "skill_gap.archetype_success_rates",
        "skill_gap.students",
    ] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to clear {table}"))?;
    }

    for (position, student) in dataset.students.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO skill_gap.students (student_id, archetype, final_result, position)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (student_id) DO UPDATE
            SET archetype = EXCLUDED.archetype, final_result = EXCLUDED.final_result
            "#,
        )
        .bind(&student.student_id)
        .bind(student.archetype.label())
        .bind(student.final_result.as_deref())
        .bind(position_of(position)?)
        .execute(&mut *tx)
        .await?;
        counts.students += 1;
    }

    let engagement = engagement_rows(dataset)?;
    insert_grid(
        &mut tx,
        "INSERT INTO skill_gap.engagement \
         (student_id, activity, level, student_position, activity_position) ",
        &engagement,
    )
    .await
    .context("failed to insert engagement")?;
    counts.engagement = engagement.len();

    let templates = template_rows(dataset)?;
    insert_grid(
        &mut tx,
        "INSERT INTO skill_gap.success_templates \
         (archetype, activity, target, archetype_position, activity_position) ",
        &templates,
    )
    .await
    .context("failed to insert success templates")?;
    counts.template_entries = templates.len();

    if let Some(correlations) = &dataset.correlations {
        let rows = correlations
            .iter()
            .enumerate()
            .map(|(position, (activity, correlation))| -> anyhow::Result<_> {
                Ok((activity, correlation, position_of(position)?))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        for chunk in rows.chunks(MAX_BIND_PARAMS / 3) {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO skill_gap.activity_correlations (activity, correlation, position) ",
            );
            builder.push_values(chunk, |mut row, (activity, correlation, position)| {
                row.push_bind(*activity)
                    .push_bind(*correlation)
                    .push_bind(*position);
            });
            builder
                .build()
                .execute(&mut *tx)
                .await
                .context("failed to insert activity correlations")?;
        }
        counts.correlations = rows.len();
    }

    insert_success_rates(&mut tx, dataset).await?;
    tx.commit().await?;

    info!(
        students = counts.students,
        engagement = counts.engagement,
        template_entries = counts.template_entries,
        correlations = counts.correlations,
        "imported dataset"
    );
    Ok(counts)
}

/// Postgres rejects statements with more bind parameters than this.
const MAX_BIND_PARAMS: usize = 65_535;
const GRID_COLUMNS: usize = 5;
const GRID_CHUNK_ROWS: usize = MAX_BIND_PARAMS / GRID_COLUMNS;

/// One cell of a keyed activity table (engagement or success templates),
/// with the positions needed to read it back in order.
#[derive(Debug, Clone, PartialEq)]
struct GridRow<'a> {
    key: &'a str,
    activity: &'a str,
    value: f64,
    key_position: i32,
    activity_position: i32,
}

fn engagement_rows(dataset: &Dataset) -> anyhow::Result<Vec<GridRow<'_>>> {
    let mut rows = Vec::new();
    for (student_position, (student_id, engagement)) in dataset.engagement.iter().enumerate() {
        for (activity_position, (activity, level)) in engagement.iter().enumerate() {
            rows.push(GridRow {
                key: student_id,
                activity,
                value: level,
                key_position: position_of(student_position)?,
                activity_position: position_of(activity_position)?,
            });
        }
    }
    Ok(rows)
}

fn template_rows(dataset: &Dataset) -> anyhow::Result<Vec<GridRow<'_>>> {
    let mut rows = Vec::new();
    for (archetype_position, (archetype, template)) in dataset.templates.iter().enumerate() {
        for (activity_position, (activity, target)) in template.iter().enumerate() {
            rows.push(GridRow {
                key: archetype.label(),
                activity,
                value: target,
                key_position: position_of(archetype_position)?,
                activity_position: position_of(activity_position)?,
            });
        }
    }
    Ok(rows)
}

/// Multi-row inserts, split so no statement exceeds the bind limit.
async fn insert_grid(
    tx: &mut Transaction<'_, Postgres>,
    insert: &str,
    rows: &[GridRow<'_>],
) -> anyhow::Result<()> {
    for chunk in rows.chunks(GRID_CHUNK_ROWS) {
        let mut builder = QueryBuilder::<Postgres>::new(insert);
        builder.push_values(chunk, |mut row, cell| {
            row.push_bind(cell.key)
                .push_bind(cell.activity)
                .push_bind(cell.value)
                .push_bind(cell.key_position)
                .push_bind(cell.activity_position);
        });
        builder.build().execute(&mut **tx).await?;
    }
    Ok(())
}

async fn insert_success_rates(
    tx: &mut Transaction<'_, Postgres>,
    dataset: &Dataset,
) -> anyhow::Result<()> {
    for (archetype, rate) in &dataset.success_rates {
        sqlx::query(
            r#"
            INSERT INTO skill_gap.archetype_success_rates (archetype, success_rate)
            VALUES ($1, $2)
            "#,
        )
        .bind(archetype.label())
        .bind(*rate)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

pub async fn load_dataset(pool: &PgPool) -> anyhow::Result<Dataset> {
    let mut dataset = Dataset::default();

    let rows = sqlx::query(
        "SELECT student_id, archetype, final_result FROM skill_gap.students ORDER BY position",
    )
    .fetch_all(pool)
    .await
    .context("failed to fetch students")?;
    for row in rows {
        dataset.students.push(StudentRecord {
            student_id: row.get("student_id"),
            archetype: Archetype::from(row.get::<String, _>("archetype")),
            final_result: row.get("final_result"),
        });
    }

    let rows = sqlx::query(
        "SELECT student_id, activity, level FROM skill_gap.engagement \
         ORDER BY student_position, activity_position",
    )
    .fetch_all(pool)
    .await
    .context("failed to fetch engagement")?;
    for row in rows {
        dataset
            .engagement
            .entry(row.get("student_id"))
            .or_default()
            .insert(row.get::<String, _>("activity"), row.get::<f64, _>("level"));
    }

    let rows = sqlx::query(
        "SELECT archetype, activity, target FROM skill_gap.success_templates \
         ORDER BY archetype_position, activity_position",
    )
    .fetch_all(pool)
    .await
    .context("failed to fetch success templates")?;
    for row in rows {
        dataset
            .templates
            .entry(Archetype::from(row.get::<String, _>("archetype")))
            .or_default()
            .insert(row.get::<String, _>("activity"), row.get::<f64, _>("target"));
    }

    let rows = sqlx::query(
        "SELECT activity, correlation FROM skill_gap.activity_correlations ORDER BY position",
    )
    .fetch_all(pool)
    .await
    .context("failed to fetch activity correlations")?;
    if !rows.is_empty() {
        let correlations: CorrelationMap = rows
            .iter()
            .map(|row| {
                (
                    row.get::<String, _>("activity"),
                    row.get::<f64, _>("correlation"),
                )
            })
            .collect();
        dataset.correlations = Some(correlations);
    }

    let rows = sqlx::query("SELECT archetype, success_rate FROM skill_gap.archetype_success_rates")
        .fetch_all(pool)
        .await
        .context("failed to fetch archetype success rates")?;
    for row in rows {
        dataset.success_rates.insert(
            Archetype::from(row.get::<String, _>("archetype")),
            row.get("success_rate"),
        );
    }

    info!(
        students = dataset.students.len(),
        engagement_rows = dataset.engagement.len(),
        templates = dataset.templates.len(),
        "loaded dataset from postgres"
    );
    Ok(dataset)
}

/// Small but realistic dataset for demos and smoke tests.
pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    import_dataset(pool, &seed_dataset()).await?;
    Ok(())
}

pub fn seed_dataset() -> Dataset {
    let mut dataset = Dataset::default();

    let students = [
        ("11391_AAA_2013J", Archetype::EarlyStruggler, "Fail"),
        ("28400_AAA_2013J", Archetype::HighPerformer, "Distinction"),
        ("30268_BBB_2014B", Archetype::TalentedButInconsistent, "Pass"),
        ("31604_BBB_2014B", Archetype::DisengagedAtRisk, "Withdrawn"),
        ("32885_CCC_2014J", Archetype::ModeratePerformer, "Pass"),
    ];
    let engagement = [
        [0.12, 0.05, 0.30, 0.20, 0.02],
        [0.85, 0.70, 0.90, 0.60, 0.40],
        [0.55, 0.15, 0.65, 0.35, 0.10],
        [0.02, 0.00, 0.05, 0.01, 0.00],
        [0.45, 0.35, 0.50, 0.30, 0.20],
    ];
    let templates = [
        (Archetype::HighPerformer, [0.80, 0.65, 0.85, 0.55, 0.35]),
        (Archetype::TalentedButInconsistent, [0.70, 0.45, 0.75, 0.45, 0.25]),
        (Archetype::ModeratePerformer, [0.60, 0.40, 0.65, 0.40, 0.20]),
        (Archetype::EarlyStruggler, [0.55, 0.35, 0.60, 0.35, 0.15]),
        (Archetype::DisengagedAtRisk, [0.40, 0.25, 0.45, 0.25, 0.10]),
    ];
    let activities = ["quiz", "forumng", "oucontent", "resource", "ouwiki"];

    for ((id, archetype, result), levels) in students.into_iter().zip(engagement) {
        dataset.students.push(StudentRecord {
            student_id: id.to_string(),
            archetype,
            final_result: Some(result.to_string()),
        });
        dataset.engagement.insert(
            id.to_string(),
            activities.iter().copied().zip(levels).collect(),
        );
    }
    for (archetype, targets) in templates {
        dataset
            .templates
            .insert(archetype, activities.iter().copied().zip(targets).collect());
    }
    dataset.correlations = Some(
        activities
            .iter()
            .copied()
            .zip([0.42, 0.18, 0.35, 0.08, -0.05])
            .collect(),
    );
    for (archetype, rate) in [
        (Archetype::HighPerformer, 0.93),
        (Archetype::TalentedButInconsistent, 0.71),
        (Archetype::ModeratePerformer, 0.64),
        (Archetype::EarlyStruggler, 0.38),
        (Archetype::DisengagedAtRisk, 0.12),
    ] {
        dataset.success_rates.insert(archetype, rate);
    }

    dataset
}

fn position_of(index: usize) -> anyhow::Result<i32> {
    i32::try_from(index).context("too many rows to record their order")
}
