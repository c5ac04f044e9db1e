//! Benchmarks for the hot evaluation path: `eval::eval` and
//! `simplify::simplify` over representative expressions. Gated behind
//! `internal_benches`; not part of the default build.

use abac_engine::claims::Claims;
use abac_engine::logical::{CompareOp, LogicalExpression};
use abac_engine::simplify::{simplify, SimplifyOptions};
use abac_engine::value::{AttributeItem, Value};

fn main() {
	divan::main();
}

fn claim_heavy_expression() -> LogicalExpression {
	LogicalExpression::And(vec![
		LogicalExpression::Compare(
			CompareOp::Eq,
			Value::Attribute(AttributeItem::Claim("role".to_string())),
			Value::Str("admin".to_string()),
		),
		LogicalExpression::Compare(
			CompareOp::Ge,
			Value::Attribute(AttributeItem::Claim("level".to_string())),
			Value::Num(3.0),
		),
		LogicalExpression::Or(vec![
			LogicalExpression::Compare(
				CompareOp::Eq,
				Value::Field("$sm#owner".to_string()),
				Value::Attribute(AttributeItem::Claim("sub".to_string())),
			),
			LogicalExpression::Boolean(false),
		]),
	])
}

fn sample_claims() -> Claims {
	[
		("role".to_string(), serde_json::json!("admin")),
		("level".to_string(), serde_json::json!(5)),
		("sub".to_string(), serde_json::json!("alice")),
	]
	.into_iter()
	.collect()
}

#[divan::bench]
fn eval_claim_heavy(bencher: divan::Bencher) {
	let le = claim_heavy_expression();
	let claims = sample_claims();
	bencher.bench(|| abac_engine::eval::eval(std::hint::black_box(&le), std::hint::black_box(&claims)));
}

#[divan::bench]
fn simplify_claim_heavy(bencher: divan::Bencher) {
	let le = claim_heavy_expression();
	let claims = sample_claims();
	let opts = SimplifyOptions::default();
	bencher.bench(|| simplify(std::hint::black_box(&le), std::hint::black_box(&claims), opts));
}
