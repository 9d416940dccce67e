use std::collections::HashMap;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::{
    entity::products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    error::AppResult,
};

/// Catalogue rows for the requested ids. Ids with no row are simply absent.
pub async fn find_products<C>(
    conn: &C,
    product_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, ProductModel>>
where
    C: ConnectionTrait,
{
    if product_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let found = Products::find()
        .filter(ProdCol::Id.is_in(product_ids.iter().copied()))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    Ok(found)
}

/// Current price of each product that still exists.
pub async fn price_and_existence<C>(conn: &C, product_ids: &[Uuid]) -> AppResult<HashMap<Uuid, i64>>
where
    C: ConnectionTrait,
{
    let prices = find_products(conn, product_ids)
        .await?
        .into_iter()
        .map(|(id, product)| (id, product.price))
        .collect();
    Ok(prices)
}
