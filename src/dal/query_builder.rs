use std::collections::BTreeSet;

use super::schema::{Column, TableName, ID_COLUMN};

// ============================================================================
// Query Builder - Parameterized SQL for the CRUD verbs
// ============================================================================
//
// Pure functions, no I/O. Placeholders use the Postgres `$n` dialect,
// numbered from 1 and contiguous. Identifiers come in pre-validated
// (`TableName`, catalog `Column`) and are rendered double-quoted.
//
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BuildError {
    #[error("Statement needs at least one value")]
    NoValues,
}

fn placeholders(range: std::ops::RangeInclusive<usize>) -> Vec<String> {
    range.map(|i| format!("${}", i)).collect()
}

/// `INSERT INTO "t" VALUES ($1, ..., $n)`
pub fn build_insert(table: &TableName, value_count: usize) -> Result<String, BuildError> {
    if value_count == 0 {
        return Err(BuildError::NoValues);
    }

    Ok(format!(
        "INSERT INTO {} VALUES ({})",
        table.quoted(),
        placeholders(1..=value_count).join(", ")
    ))
}

/// `SELECT * FROM "t" WHERE id = $1`
pub fn build_select_by_id(table: &TableName) -> String {
    format!("SELECT * FROM {} WHERE {} = $1", table.quoted(), ID_COLUMN)
}

/// `UPDATE "t" SET "c1" = $1, ..., "ck" = $k WHERE id = $k+1`
///
/// The identifier is always bound last.
pub fn build_update_by_id(table: &TableName, set_columns: &[&Column]) -> Result<String, BuildError> {
    if set_columns.is_empty() {
        return Err(BuildError::NoValues);
    }

    let assignments: Vec<String> = set_columns
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} = ${}", column.quoted(), i + 1))
        .collect();

    Ok(format!(
        "UPDATE {} SET {} WHERE {} = ${}",
        table.quoted(),
        assignments.join(", "),
        ID_COLUMN,
        set_columns.len() + 1
    ))
}

/// `DELETE FROM "t" WHERE id = $1`
pub fn build_delete_by_id(table: &TableName) -> String {
    format!("DELETE FROM {} WHERE {} = $1", table.quoted(), ID_COLUMN)
}

/// Distinct `$n` markers in `sql`. Quoted identifiers never contain `$`.
pub fn placeholder_count(sql: &str) -> usize {
    let bytes = sql.as_bytes();
    let mut seen = BTreeSet::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'$' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if end > start {
                if let Ok(n) = sql[start..end].parse::<usize>() {
                    seen.insert(n);
                }
            }
            i = end.max(start);
        } else {
            i += 1;
        }
    }

    seen.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dal::schema::ColumnType;

    fn events() -> TableName {
        TableName::new("events").unwrap()
    }

    fn column(name: &str) -> Column {
        Column { name: name.to_string(), column_type: ColumnType::Text }
    }

    #[test]
    fn test_insert_matches_expected_text() {
        assert_eq!(
            build_insert(&events(), 3).unwrap(),
            "INSERT INTO \"events\" VALUES ($1, $2, $3)"
        );
    }

    #[test]
    fn test_insert_placeholders_are_contiguous() {
        for n in 1..=40 {
            let sql = build_insert(&events(), n).unwrap();
            assert_eq!(placeholder_count(&sql), n);
            for i in 1..=n {
                assert!(sql.contains(&format!("${}", i)), "missing ${} in {}", i, sql);
            }
            assert!(!sql.contains(&format!("${}", n + 1)));
        }
    }

    #[test]
    fn test_insert_without_values_is_rejected() {
        assert_eq!(build_insert(&events(), 0), Err(BuildError::NoValues));
    }

    #[test]
    fn test_select_and_delete_have_one_placeholder() {
        assert_eq!(build_select_by_id(&events()), "SELECT * FROM \"events\" WHERE id = $1");
        assert_eq!(build_delete_by_id(&events()), "DELETE FROM \"events\" WHERE id = $1");
        assert_eq!(placeholder_count(&build_select_by_id(&events())), 1);
        assert_eq!(placeholder_count(&build_delete_by_id(&events())), 1);
    }

    #[test]
    fn test_update_binds_id_last() {
        let (name, payload) = (column("name"), column("payload"));
        let sql = build_update_by_id(&events(), &[&name, &payload]).unwrap();

        assert_eq!(
            sql,
            "UPDATE \"events\" SET \"name\" = $1, \"payload\" = $2 WHERE id = $3"
        );
    }

    #[test]
    fn test_update_has_n_minus_one_set_placeholders() {
        let columns: Vec<Column> = (0..12).map(|i| column(&format!("c{}", i))).collect();

        for n in 2..=13 {
            let set: Vec<&Column> = columns.iter().take(n - 1).collect();
            let sql = build_update_by_id(&events(), &set).unwrap();
            let (set_clause, where_clause) = sql.split_once(" WHERE ").unwrap();

            assert_eq!(placeholder_count(set_clause), n - 1);
            assert_eq!(where_clause, format!("id = ${}", n));
            assert_eq!(placeholder_count(&sql), n);
        }
    }

    #[test]
    fn test_update_without_set_columns_is_rejected() {
        assert_eq!(build_update_by_id(&events(), &[]), Err(BuildError::NoValues));
    }

    #[test]
    fn test_placeholder_count_ignores_repeats_and_bare_dollars() {
        assert_eq!(placeholder_count("SELECT $1, $1, $2"), 2);
        assert_eq!(placeholder_count("SELECT '$' || $1"), 1);
        assert_eq!(placeholder_count("SELECT 1"), 0);
    }
}
