//! Shared fixtures for this crate's unit tests.

use kasir_core::{Category, Money, NewProduct, Product, Role, User};

use crate::repository::user::NewUser;
use crate::{Database, DbConfig};

pub(crate) async fn fixture_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub(crate) async fn seed_category(db: &Database, name: &str) -> Category {
    db.categories().create(name).await.unwrap()
}

/// Creates a product in a "Minuman" category, creating the category on first use.
pub(crate) async fn seed_product(db: &Database, name: &str, price: i64, stock: i64) -> Product {
    let category = match db.categories().get_by_name("Minuman").await.unwrap() {
        Some(c) => c,
        None => seed_category(db, "Minuman").await,
    };

    db.products()
        .create(&NewProduct {
            category_id: category.id,
            name: name.to_string(),
            price: Money::from_minor(price),
            stock,
            image: None,
        })
        .await
        .unwrap()
}

pub(crate) async fn seed_user(db: &Database, email: &str, role: Role) -> User {
    db.users()
        .create(&NewUser {
            name: "Kasir Satu".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            role,
        })
        .await
        .unwrap()
}
