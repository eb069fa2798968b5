//! Walk through the statement kinds the builder can assemble.
//!
//! Run with: cargo run --example build_statements

use myqb::{Op, QbResult, args, cond, expr, incr, row, select, set, table};

fn main() -> QbResult<()> {
    // SELECT with a field map condition
    let listing = table("articles")
        .select(&["id", "title"])
        .where_cond(cond! {
            "status" => "published",
            "category" => Op::in_list(vec!["news", "blog"]),
        })
        .order_by("`id` DESC")
        .limit(20)
        .build()?;
    println!("listing:  {listing}");

    // JOIN with aliases
    let joined = select(&["x", "y"])
        .from("hello")
        .alias("A")
        .left_join("world", &["z"])
        .alias("B")
        .on("A.id=B.id")
        .where_cond(("A.x > ?", args![5]))
        .build()?;
    println!("joined:   {joined}");

    // INSERT ... ON DUPLICATE KEY UPDATE
    let upsert = table("page_views")
        .insert(row! { "page" => "/home", "views" => 1 })
        .on_duplicate_key_update()
        .set(set! { "views" => incr(1) })
        .build()?;
    println!("upsert:   {upsert}");

    // Subquery through a raw placeholder
    let banned = select(&["id"]).from("banned_users").where_cond(cond! { "active" => 1 });
    let filtered = select(&["*"])
        .from("users")
        .where_cond(("id NOT IN ???", args![banned]))
        .build()?;
    println!("filtered: {filtered}");

    // AND/OR expression embedded as one fragment
    let visible = expr()
        .or(cond! { "owner_id" => 7 })
        .or(cond! { "visibility" => "public" });
    let documents = table("documents")
        .select(&["id"])
        .where_cond(cond! { "deleted" => 0 })
        .and(visible)
        .build()?;
    println!("visible:  {documents}");

    // Custom template with macros
    let report = table("metrics")
        .sql_values("SELECT day, SUM(hits) FROM :$table WHERE day>=? :$limit", args!["2024-01-01"])
        .limit(7)
        .build()?;
    println!("report:   {report}");

    Ok(())
}
