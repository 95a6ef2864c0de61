use std::io::{self, Write};

use clap::Parser;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

use showroom::emi::{self, EmiInputs};
use showroom::filter::BikeFilter;
use showroom::leads::{self, LeadKind};
use showroom::model::{Bike, Category, NewReview, Review};
use showroom::parser::{self, Command};
use showroom::server::USER_HEADER;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Interactive showroom client", long_about = None)]
struct Args {
    #[clap(long, default_value = "http://127.0.0.1:5000")]
    host: String,

    /// Reviewer id sent with REVIEW commands.
    #[clap(long, default_value = "cli-user")]
    user: String,
}

struct Session {
    client: Client,
    host: String,
    user: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    print_banner();

    let session = Session {
        client: Client::new(),
        host: args.host.trim_end_matches('/').to_string(),
        user: args.user,
    };

    match session.client.get(format!("{}/health", session.host)).send().await {
        Ok(resp) if resp.status().is_success() => println!("[\u{2713}] Connected to showroom at {}!", session.host),
        _ => {
            println!("[\u{2717}] Could not reach showroom at {}.", session.host);
            println!("    Start the server with 'cargo run --release --bin showroom' in another terminal.");
            return;
        }
    }
    println!("Type 'HELP' for supported commands or 'EXIT' to quit.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("showroom> ");
        let _ = io::stdout().flush();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                println!("[\u{2717}] Could not read input: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match parser::parse_command(&line) {
            Ok(Command::Exit) => break,
            Ok(cmd) => {
                if let Err(e) = session.execute(cmd).await {
                    println!("[\u{26a0}\u{fe0f} Error] {}", e);
                }
            }
            Err(e) => {
                println!("[\u{2717} Syntax Error] {}", e);
                if line.to_uppercase().starts_with("LIST") {
                    println!("    \u{2139}\u{fe0f}  Hint: Try 'LIST WHERE brand = \"KTM\" AND price <= 350000 SORT BY price_asc'");
                }
            }
        }
    }
}

fn print_banner() {
    println!("\n==================================================");
    println!("   Showroom CLI - Bikes, Reviews, EMI");
    println!("==================================================\n");
}

fn print_help() {
    println!("\n--- Available Commands ---");
    println!("1. LIST:    LIST [WHERE brand = \"KTM\" AND category = \"Trending\" AND name LIKE \"duke\"");
    println!("                  AND price >= 100000 AND price <= 400000 AND cc >= 150 AND cc <= 400]");
    println!("                 [SORT BY price_asc | price_desc | latest]");
    println!("2. GET:     GET 3");
    println!("3. REVIEWS: REVIEWS 3");
    println!("4. REVIEW:  REVIEW 3 5 \"Loved the exhaust note\"");
    println!("5. EMI:     EMI 182000 10.5 36");
    println!("6. ENQUIRE: ENQUIRE 3 [CARD | OFFER]");
    println!("7. EXIT:    Quit");
    let shelves: Vec<String> = Category::LISTED.iter().map(|c| c.to_string()).collect();
    println!("\nCategories: {}\n", shelves.join(", "));
}

impl Session {
    async fn execute(&self, cmd: Command) -> Result<(), String> {
        match cmd {
            Command::List { filter } => self.list(&filter).await,
            Command::Get { id } => self.get(id).await,
            Command::Reviews { id } => self.reviews(id).await,
            Command::Review { id, rating, comment } => self.review(id, NewReview { rating, comment }).await,
            Command::Emi { principal, rate, months } => {
                print_emi(&EmiInputs::new(principal, rate, months));
                Ok(())
            }
            Command::Enquire { id, kind } => self.enquire(id, kind).await,
            Command::Help => {
                print_help();
                Ok(())
            }
            Command::Exit => Ok(()),
        }
    }

    async fn list(&self, filter: &BikeFilter) -> Result<(), String> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(v) = &filter.brand { query.push(("brand", v.clone())); }
        if let Some(v) = filter.min_price { query.push(("minPrice", v.to_string())); }
        if let Some(v) = filter.max_price { query.push(("maxPrice", v.to_string())); }
        if let Some(v) = filter.min_cc { query.push(("minCC", v.to_string())); }
        if let Some(v) = filter.max_cc { query.push(("maxCC", v.to_string())); }
        if let Some(v) = &filter.category { query.push(("category", v.clone())); }
        if let Some(v) = &filter.search { query.push(("search", v.clone())); }
        if let Some(v) = filter.sort { query.push(("sort", v.to_string())); }

        let resp = self
            .client
            .get(format!("{}/api/bikes", self.host))
            .query(&query)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let bikes: Vec<Bike> = decode(resp).await?;

        println!("\nFound {} bikes:", bikes.len());
        for bike in &bikes {
            println!(
                "  #{:<3} {:<28} {:>12}  {} | {}cc | {}",
                bike.id,
                bike.name,
                leads::format_inr(bike.price),
                bike.year,
                bike.cc,
                bike.category
            );
        }
        println!();
        Ok(())
    }

    async fn get(&self, id: u64) -> Result<(), String> {
        let resp = self
            .client
            .get(format!("{}/api/bikes/{}", self.host, id))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if resp.status() == StatusCode::NOT_FOUND {
            println!("[\u{2717}] Bike {} Not Found.", id);
            return Ok(());
        }
        let bike: Bike = decode(resp).await?;

        println!("\n{} {} ({})", bike.brand, bike.name, bike.year);
        println!("  Ex-showroom: {}", leads::format_inr(bike.price));
        println!("  Engine:      {}cc", bike.cc);
        let specs = [
            ("Mileage", &bike.mileage),
            ("Power", &bike.power),
            ("Torque", &bike.torque),
            ("Top speed", &bike.top_speed),
            ("ABS", &bike.abs),
            ("Rating", &bike.rating),
        ];
        for (label, value) in specs {
            if let Some(v) = value {
                println!("  {:<12} {}", format!("{}:", label), v);
            }
        }
        if !bike.available_colors.is_empty() {
            println!("  Colours:     {}", bike.available_colors.join(", "));
        }
        print_emi(&emi::EmiDefaults::for_price(bike.price).inputs);
        Ok(())
    }

    async fn reviews(&self, id: u64) -> Result<(), String> {
        let resp = self
            .client
            .get(format!("{}/api/bikes/{}/reviews", self.host, id))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let reviews: Vec<Review> = decode(resp).await?;
        if reviews.is_empty() {
            println!("No reviews yet for bike {}.", id);
        }
        for review in reviews {
            println!("{}", review_line(&review));
        }
        Ok(())
    }

    async fn review(&self, id: u64, review: NewReview) -> Result<(), String> {
        let resp = self
            .client
            .post(format!("{}/api/bikes/{}/reviews", self.host, id))
            .header(USER_HEADER, &self.user)
            .json(&review)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let stored: Review = decode(resp).await?;
        println!("[\u{2713} OK] Review #{} saved for bike {}", stored.id, stored.bike_id);
        Ok(())
    }

    async fn enquire(&self, id: u64, kind: LeadKind) -> Result<(), String> {
        let kind_param = match kind {
            LeadKind::Card => "card",
            LeadKind::Offer => "offer",
        };
        let resp = self
            .client
            .get(format!("{}/api/bikes/{}/enquiry", self.host, id))
            .query(&[("kind", kind_param)])
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let lead: leads::Lead = decode(resp).await?;
        println!("\n{}\n\nOpen: {}\n", lead.message, lead.url);
        Ok(())
    }
}

fn review_line(review: &Review) -> String {
    format!(
        "  {} {} | \"{}\"",
        "\u{2605}".repeat(review.rating as usize),
        review.user_id,
        review.comment
    )
}

fn print_emi(inputs: &EmiInputs) {
    match emi_lines(inputs) {
        Ok(lines) => lines.iter().for_each(|line| println!("{}", line)),
        Err(e) => println!("[\u{2717}] {}", e),
    }
}

// EMI figures are whole rupees; only price tags get the rounded form.
fn emi_lines(inputs: &EmiInputs) -> showroom::Result<[String; 2]> {
    let q = emi::quote(inputs)?;
    Ok([
        format!(
            "  EMI: {} / month for {} months at {}% on {}",
            leads::format_inr_exact(q.emi),
            inputs.months,
            inputs.annual_rate,
            leads::format_inr_exact(inputs.principal.round() as u64)
        ),
        format!(
            "  Total payable {}, interest {}",
            leads::format_inr_exact(q.total_payable),
            leads::format_inr_exact(q.total_interest)
        ),
    ])
}

async fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, String> {
    let status = resp.status();
    if status.is_success() {
        return resp.json::<T>().await.map_err(|e| e.to_string());
    }
    let body: Value = resp.json().await.unwrap_or(Value::Null);
    let message = body.get("message").and_then(Value::as_str).unwrap_or("request failed");
    Err(format!("{} ({})", message, status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emi_is_printed_to_the_rupee() {
        let [emi, totals] = emi_lines(&EmiInputs::new(182_000.0, 10.5, 36)).unwrap();
        assert_eq!(emi, "  EMI: ₹5,915 / month for 36 months at 10.5% on ₹1,82,000");
        assert_eq!(totals, "  Total payable ₹2,12,940, interest ₹30,940");
        assert!(emi_lines(&EmiInputs::new(0.0, 10.5, 36)).is_err());
    }

    #[test]
    fn review_line_uses_ascii_separator() {
        let review = Review {
            id: 1,
            bike_id: 3,
            user_id: "rider-7".into(),
            rating: 4,
            comment: "Smooth gearbox".into(),
            created_at: 0,
        };
        let line = review_line(&review);
        assert_eq!(line, "  \u{2605}\u{2605}\u{2605}\u{2605} rider-7 | \"Smooth gearbox\"");
    }
}
