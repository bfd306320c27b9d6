//! Pages through a coupon catalog, then switches the filter and redeems a
//! coupon.
//!
//! Reads the catalog named by `COUPONS_CATALOG` (default:
//! `fixtures/catalog.json`). Redemptions are kept in memory only.
//!
//! Run: `cargo run --example browse --features cli`

use std::process::ExitCode;

use coupon_feed::feed::{CouponFeedBlocking, PageLoad};
use coupon_feed::models::{Category, Coupon};
use coupon_feed::source::CatalogSource;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let _dotenv = dotenvy::dotenv();

    let path = std::env::var("COUPONS_CATALOG")
        .unwrap_or_else(|_| "fixtures/catalog.json".to_owned());

    let feed = CouponFeedBlocking::builder()
        .source(CatalogSource::from_path(&path)?)
        .page_size(4)
        .build()?;

    // Keep scrolling until the source runs dry.
    while let PageLoad::Loaded { added, has_more } = feed.load_next_page()? {
        println!("page: {added} new coupons (more: {has_more})");
    }
    print_feed("All coupons", &feed.coupons()?);

    let _first = feed.reset_filter(Category::Korean)?;
    print_feed("Korean, first page", &feed.coupons()?);

    let target = feed
        .with_coupons(|coupons| coupons.iter().find(|c| !c.is_used).map(|c| c.id))?
        .ok_or("no unused coupon on the first page")?;
    feed.redeem(target)?;
    println!("redeemed coupon {target}");

    if let Err(err) = feed.redeem(target) {
        println!("second attempt rejected: {err}");
    }
    Ok(())
}

fn print_feed(title: &str, coupons: &[Coupon]) {
    println!("\n{title} ({})", coupons.len());
    for coupon in coupons {
        let kind = if coupon.is_promise { "promise" } else { "regular" };
        println!(
            "  {:>4}  {:<8} {:<18} {}",
            coupon.id, kind, coupon.merchant_name, coupon.title
        );
    }
}
