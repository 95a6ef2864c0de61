use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_until},
    character::complete::{char, digit1, multispace0, multispace1},
    combinator::{map, map_res, opt, recognize, value},
    multi::separated_list1,
    sequence::{delimited, preceded, tuple},
    IResult,
};

use crate::filter::{BikeFilter, SortOrder};
use crate::leads::LeadKind;

#[derive(Debug, PartialEq, Clone)]
pub enum Command {
    List { filter: BikeFilter },
    Get { id: u64 },
    Reviews { id: u64 },
    Review { id: u64, rating: u8, comment: String },
    Emi { principal: f64, rate: f64, months: u32 },
    Enquire { id: u64, kind: LeadKind },
    Help,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Bound {
    AtLeast,
    AtMost,
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Brand(String),
    Category(String),
    NameLike(String),
    Price(Bound, u64),
    Cc(Bound, u32),
}

// --- BASIC PARSERS ---

fn parse_float(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((digit1, opt(tuple((char('.'), digit1)))))),
        |s: &str| s.parse::<f64>(),
    )(input)
}

fn parse_u64(input: &str) -> IResult<&str, u64> {
    map_res(digit1, |s: &str| s.parse::<u64>())(input)
}

fn parse_u32(input: &str) -> IResult<&str, u32> {
    map_res(digit1, |s: &str| s.parse::<u32>())(input)
}

fn parse_quoted_string(input: &str) -> IResult<&str, String> {
    let (input, _) = char('"')(input)?;
    let (input, content) = take_until("\"")(input)?;
    let (input, _) = char('"')(input)?;
    Ok((input, content.to_string()))
}

// --- HELPERS ---
fn ws<'a, F, O, E: nom::error::ParseError<&'a str>>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O, E>
where
    F: FnMut(&'a str) -> IResult<&'a str, O, E>,
{
    delimited(multispace0, inner, multispace0)
}

fn tag_ci(t: &'static str) -> impl FnMut(&str) -> IResult<&str, &str> {
    move |input| tag_no_case(t)(input)
}

fn parse_bound(input: &str) -> IResult<&str, Bound> {
    alt((value(Bound::AtLeast, tag(">=")), value(Bound::AtMost, tag("<="))))(input)
}

fn parse_sort(input: &str) -> IResult<&str, SortOrder> {
    alt((
        value(SortOrder::PriceAsc, tag_ci("price_asc")),
        value(SortOrder::PriceDesc, tag_ci("price_desc")),
        value(SortOrder::Latest, tag_ci("latest")),
    ))(input)
}

// --- CONDITIONS ---

fn parse_condition(input: &str) -> IResult<&str, Condition> {
    alt((
        map(preceded(tuple((tag_ci("BRAND"), ws(char('=')))), parse_quoted_string), Condition::Brand),
        map(preceded(tuple((tag_ci("CATEGORY"), ws(char('=')))), parse_quoted_string), Condition::Category),
        map(
            preceded(tuple((tag_ci("NAME"), ws(tag_ci("LIKE")))), parse_quoted_string),
            Condition::NameLike,
        ),
        map(
            tuple((preceded(tag_ci("PRICE"), ws(parse_bound)), parse_u64)),
            |(bound, n)| Condition::Price(bound, n),
        ),
        map(
            tuple((preceded(tag_ci("CC"), ws(parse_bound)), parse_u32)),
            |(bound, n)| Condition::Cc(bound, n),
        ),
    ))(input)
}

fn fold_conditions(conditions: Vec<Condition>, sort: Option<SortOrder>) -> BikeFilter {
    let mut filter = BikeFilter { sort, ..Default::default() };
    for condition in conditions {
        match condition {
            Condition::Brand(b) => filter.brand = Some(b),
            Condition::Category(c) => filter.category = Some(c),
            Condition::NameLike(s) => filter.search = Some(s),
            Condition::Price(Bound::AtLeast, n) => filter.min_price = Some(n),
            Condition::Price(Bound::AtMost, n) => filter.max_price = Some(n),
            Condition::Cc(Bound::AtLeast, n) => filter.min_cc = Some(n),
            Condition::Cc(Bound::AtMost, n) => filter.max_cc = Some(n),
        }
    }
    filter
}

// --- COMMAND PARSERS ---

fn parse_list(input: &str) -> IResult<&str, Command> {
    let (input, _) = alt((tag_ci("LIST"), tag_ci("FIND")))(input)?;
    let (input, _) = opt(preceded(multispace1, tag_ci("BIKES")))(input)?;

    let (input, conditions) = opt(preceded(
        ws(tag_ci("WHERE")),
        separated_list1(ws(tag_ci("AND")), parse_condition),
    ))(input)?;

    let (input, sort) = opt(preceded(
        tuple((ws(tag_ci("SORT")), ws(tag_ci("BY")))),
        parse_sort,
    ))(input)?;

    let filter = fold_conditions(conditions.unwrap_or_default(), sort);
    Ok((input, Command::List { filter }))
}

fn parse_get(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("GET")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, id) = parse_u64(input)?;
    Ok((input, Command::Get { id }))
}

fn parse_reviews(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("REVIEWS")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, id) = parse_u64(input)?;
    Ok((input, Command::Reviews { id }))
}

fn parse_review(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("REVIEW")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, id) = parse_u64(input)?;
    let (input, rating) = ws(map_res(digit1, |s: &str| s.parse::<u8>()))(input)?;
    let (input, comment) = parse_quoted_string(input)?;
    Ok((input, Command::Review { id, rating, comment }))
}

fn parse_emi(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("EMI")(input)?;
    let (input, principal) = ws(parse_float)(input)?;
    let (input, rate) = parse_float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, months) = parse_u32(input)?;
    Ok((input, Command::Emi { principal, rate, months }))
}

fn parse_enquire(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("ENQUIRE")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, id) = parse_u64(input)?;
    let (input, kind) = opt(preceded(
        multispace1,
        alt((value(LeadKind::Offer, tag_ci("OFFER")), value(LeadKind::Card, tag_ci("CARD")))),
    ))(input)?;
    Ok((input, Command::Enquire { id, kind: kind.unwrap_or_default() }))
}

fn parse_help(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("HELP")(input)?;
    Ok((input, Command::Help))
}

fn parse_exit(input: &str) -> IResult<&str, Command> {
    let (input, _) = alt((tag_ci("EXIT"), tag_ci("QUIT")))(input)?;
    Ok((input, Command::Exit))
}

pub fn parse_command(input: &str) -> Result<Command, String> {
    let input = input.trim();
    // REVIEWS before REVIEW: the shorter keyword is a prefix of the longer.
    let result = alt((
        parse_list,
        parse_get,
        parse_reviews,
        parse_review,
        parse_emi,
        parse_enquire,
        parse_help,
        parse_exit,
    ))(input);

    match result {
        Ok((remainder, cmd)) => {
            if !remainder.trim().is_empty() {
                return Err(format!("Unexpected tokens at end: '{}'", remainder));
            }
            Ok(cmd)
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let context = if e.input.chars().count() > 20 {
                format!("{}...", e.input.chars().take(20).collect::<String>())
            } else {
                e.input.to_string()
            };
            Err(format!("Invalid syntax near: '{}'", context))
        }
        Err(nom::Err::Incomplete(_)) => Err("Incomplete command.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_list() {
        assert_eq!(
            parse_command("list").unwrap(),
            Command::List { filter: BikeFilter::default() }
        );
        assert_eq!(
            parse_command("LIST BIKES").unwrap(),
            Command::List { filter: BikeFilter::default() }
        );
    }

    #[test]
    fn list_with_conditions_and_sort() {
        let cmd = parse_command(
            r#"LIST BIKES WHERE brand = "KTM" AND price >= 100000 AND price <= 400000 AND cc <= 400 AND name like "duke" SORT BY price_desc"#,
        )
        .unwrap();
        let Command::List { filter } = cmd else { panic!("expected list") };
        assert_eq!(filter.brand.as_deref(), Some("KTM"));
        assert_eq!(filter.min_price, Some(100000));
        assert_eq!(filter.max_price, Some(400000));
        assert_eq!(filter.max_cc, Some(400));
        assert_eq!(filter.search.as_deref(), Some("duke"));
        assert_eq!(filter.sort, Some(SortOrder::PriceDesc));
    }

    #[test]
    fn category_with_spaces() {
        let Command::List { filter } = parse_command(r#"find where category = "Royal Enfield""#).unwrap() else {
            panic!("expected list")
        };
        assert_eq!(filter.category.as_deref(), Some("Royal Enfield"));
    }

    #[test]
    fn lookups() {
        assert_eq!(parse_command("GET 3").unwrap(), Command::Get { id: 3 });
        assert_eq!(parse_command("reviews 3").unwrap(), Command::Reviews { id: 3 });
        assert_eq!(
            parse_command(r#"REVIEW 3 5 "Loved the exhaust note""#).unwrap(),
            Command::Review { id: 3, rating: 5, comment: "Loved the exhaust note".into() }
        );
    }

    #[test]
    fn emi_and_enquiry() {
        assert_eq!(
            parse_command("EMI 182000 10.5 36").unwrap(),
            Command::Emi { principal: 182000.0, rate: 10.5, months: 36 }
        );
        assert_eq!(
            parse_command("enquire 4 offer").unwrap(),
            Command::Enquire { id: 4, kind: LeadKind::Offer }
        );
        assert_eq!(
            parse_command("ENQUIRE 4").unwrap(),
            Command::Enquire { id: 4, kind: LeadKind::Card }
        );
    }

    #[test]
    fn rejects_trailing_and_malformed_input() {
        assert!(parse_command("GET 3 4").is_err());
        assert!(parse_command("GET abc").is_err());
        assert!(parse_command("LIST WHERE price > 5").is_err());
        assert!(parse_command("LIST SORT BY cheapest").is_err());
        assert_eq!(parse_command("quit").unwrap(), Command::Exit);
    }
}
