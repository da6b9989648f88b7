//! Database operations for categories.

use rusqlite::{Connection, Row, params};

use crate::{
    Error,
    category::{Category, CategoryForm, CategoryType, CategoryUpdate},
    database_id::CategoryId,
};

/// Create a category and return it with its generated ID.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyName] if the category name is blank,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_category(form: &CategoryForm, connection: &Connection) -> Result<Category, Error> {
    let name = form.name.trim();

    if name.is_empty() {
        return Err(Error::EmptyName("category name"));
    }

    connection.execute(
        "INSERT INTO category (name, type, icon, color) VALUES (?1, ?2, ?3, ?4)",
        params![name, form.kind.as_str(), form.icon, form.color],
    )?;

    let id = connection.last_insert_rowid();

    Ok(Category {
        id,
        name: name.to_owned(),
        kind: form.kind,
        icon: form.icon.clone(),
        color: form.color.clone(),
    })
}

/// Retrieve a single category by ID.
pub fn get_category(category_id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, name, type, icon, color FROM category WHERE id = :id")?
        .query_row(&[(":id", &category_id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve all categories ordered alphabetically by name.
pub fn list_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, name, type, icon, color FROM category ORDER BY name ASC")?
        .query_map([], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Merge `update` into the stored category. Returns an error if the category
/// doesn't exist.
pub fn update_category(
    category_id: CategoryId,
    update: CategoryUpdate,
    connection: &Connection,
) -> Result<Category, Error> {
    let current = get_category(category_id, connection).map_err(|error| match error {
        Error::NotFound => Error::UpdateMissingCategory,
        error => error,
    })?;

    let name = match update.name {
        Some(name) => {
            let name = name.trim().to_owned();
            if name.is_empty() {
                return Err(Error::EmptyName("category name"));
            }
            name
        }
        None => current.name,
    };

    let category = Category {
        id: category_id,
        name,
        kind: update.kind.unwrap_or(current.kind),
        icon: update.icon.unwrap_or(current.icon),
        color: update.color.unwrap_or(current.color),
    };

    connection.execute(
        "UPDATE category SET name = ?1, type = ?2, icon = ?3, color = ?4 WHERE id = ?5",
        params![
            category.name,
            category.kind.as_str(),
            category.icon,
            category.color,
            category_id
        ],
    )?;

    Ok(category)
}

/// Delete a category by ID. Returns an error if the category doesn't exist.
pub fn delete_category(category_id: CategoryId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM category WHERE id = ?1", [category_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    Ok(())
}

/// Check whether a category with `id` exists.
///
/// The settlement engine calls this before appending to the ledger so a
/// payment can never reference a non-existent category.
pub fn category_exists(id: CategoryId, connection: &Connection) -> Result<bool, Error> {
    let exists = connection.query_row(
        "SELECT EXISTS (SELECT 1 FROM category WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )?;

    Ok(exists)
}

/// Initialize the category table.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            type TEXT NOT NULL,
            icon TEXT NOT NULL,
            color TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let name = row.get(1)?;
    let raw_kind: String = row.get(2)?;
    let kind = CategoryType::parse(&raw_kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown category type \"{raw_kind}\"").into(),
        )
    })?;
    let icon = row.get(3)?;
    let color = row.get(4)?;

    Ok(Category {
        id,
        name,
        kind,
        icon,
        color,
    })
}

#[cfg(test)]
mod category_query_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        category::{Category, CategoryForm, CategoryType, CategoryUpdate},
        db::initialize,
    };

    use super::{
        category_exists, create_category, delete_category, get_category, list_categories,
        update_category,
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    fn groceries_form() -> CategoryForm {
        CategoryForm {
            name: "Groceries".to_owned(),
            kind: CategoryType::Expense,
            icon: "🛒".to_owned(),
            color: "#4ade80".to_owned(),
        }
    }

    #[test]
    fn create_category_succeeds() {
        let connection = get_test_connection();

        let category =
            create_category(&groceries_form(), &connection).expect("Could not create category");

        assert!(category.id > 0);
        assert_eq!(category.name, "Groceries");
        assert_eq!(category.kind, CategoryType::Expense);
    }

    #[test]
    fn create_category_fails_on_blank_name() {
        let connection = get_test_connection();

        let result = create_category(
            &CategoryForm {
                name: "\n\t \r".to_owned(),
                kind: CategoryType::Both,
                icon: String::new(),
                color: String::new(),
            },
            &connection,
        );

        assert_eq!(result, Err(Error::EmptyName("category name")));
    }

    #[test]
    fn get_category_succeeds() {
        let connection = get_test_connection();
        let inserted = create_category(&groceries_form(), &connection).unwrap();

        let selected = get_category(inserted.id, &connection);

        assert_eq!(Ok(inserted), selected);
    }

    #[test]
    fn get_category_with_invalid_id_returns_not_found() {
        let connection = get_test_connection();

        let selected = get_category(1337, &connection);

        assert_eq!(selected, Err(Error::NotFound));
    }

    #[test]
    fn list_categories_orders_by_name() {
        let connection = get_test_connection();
        for name in ["Transport", "Groceries", "Salary"] {
            create_category(
                &CategoryForm {
                    name: name.to_owned(),
                    kind: CategoryType::Both,
                    icon: String::new(),
                    color: String::new(),
                },
                &connection,
            )
            .unwrap();
        }

        let categories: Vec<Category> = list_categories(&connection).unwrap();

        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Groceries", "Salary", "Transport"]);
    }

    #[test]
    fn update_category_merges_fields() {
        let connection = get_test_connection();
        let category = create_category(&groceries_form(), &connection).unwrap();

        let updated = update_category(
            category.id,
            CategoryUpdate {
                color: Some("#f87171".to_owned()),
                ..Default::default()
            },
            &connection,
        )
        .expect("Could not update category");

        assert_eq!(updated.name, "Groceries");
        assert_eq!(updated.color, "#f87171");
        assert_eq!(get_category(category.id, &connection), Ok(updated));
    }

    #[test]
    fn update_category_with_invalid_id_returns_not_found() {
        let connection = get_test_connection();

        let result = update_category(999_999, CategoryUpdate::default(), &connection);

        assert_eq!(result, Err(Error::UpdateMissingCategory));
    }

    #[test]
    fn delete_category_succeeds() {
        let connection = get_test_connection();
        let category = create_category(&groceries_form(), &connection).unwrap();

        let result = delete_category(category.id, &connection);

        assert_eq!(result, Ok(()));
        assert_eq!(get_category(category.id, &connection), Err(Error::NotFound));
    }

    #[test]
    fn delete_category_with_invalid_id_returns_not_found() {
        let connection = get_test_connection();

        let result = delete_category(999_999, &connection);

        assert_eq!(result, Err(Error::DeleteMissingCategory));
    }

    #[test]
    fn category_exists_reflects_database_state() {
        let connection = get_test_connection();
        let category = create_category(&groceries_form(), &connection).unwrap();

        assert_eq!(category_exists(category.id, &connection), Ok(true));
        assert_eq!(category_exists(category.id + 1, &connection), Ok(false));
    }
}
