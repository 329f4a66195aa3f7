//! Shared Northwind-style collections for unit tests.

use crate::schema::{Collection, DataType, IndexKind, Schema};

/// `orders`: primary key `id`, partitioned by `type`.
pub fn orders() -> Collection {
    Collection::new("orders")
        .with_property("id", DataType::String)
        .with_property("orderID", DataType::String)
        .with_property("customerID", DataType::String)
        .with_property("orderDate", DataType::Date)
        .with_property("shipCity", DataType::String)
        .with_property("shipCountry", DataType::String)
        .with_property("shipRegion", DataType::String)
        .with_property("freight", DataType::Number)
        .with_property("type", DataType::String)
        .with_index("pk", IndexKind::Primary, &["id"])
        .with_index("byOrderId", IndexKind::Unique, &["orderID"])
        .with_index("PartitionKey", IndexKind::Other, &["type"])
        .with_relationship("customer", "customers", &["customerID"])
}

/// `orderDetails`: compound primary key `(orderID, productID)`.
pub fn order_details() -> Collection {
    Collection::new("orderDetails")
        .with_table("order_details")
        .with_property("orderID", DataType::Int)
        .with_property("productID", DataType::String)
        .with_property("quantity", DataType::Int)
        .with_index("pk", IndexKind::Primary, &["orderID", "productID"])
        .with_index("byOrder", IndexKind::Other, &["orderID"])
}

pub fn customers() -> Collection {
    Collection::new("customers")
        .with_property("customerID", DataType::String)
        .with_property("companyName", DataType::String)
        .with_property("country", DataType::String)
        .with_index("pk", IndexKind::Primary, &["customerID"])
}

pub fn schema() -> Schema {
    Schema::new(vec![orders(), order_details(), customers()]).expect("fixture schema is valid")
}
