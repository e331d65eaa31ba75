use ccr_margin_core::model::trade::AssetClass;
use ccr_margin_core::sa_ccr::exposure::{calculate_sa_ccr, calculate_sa_ccr_with, SaCcrInput};
use ccr_margin_core::sa_ccr::parameters::SaCcrParameters;
use ccr_margin_core::CcrMarginError;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// SA-CCR integration tests, driven through the JSON input shape
// ===========================================================================

fn mixed_book() -> SaCcrInput {
    serde_json::from_str(
        r#"{
        "netting_set": {"id": "CPTY-1"},
        "valuation_date": "2025-01-01",
        "trades": [
            {"asset_class": "INTEREST_RATE", "id": "IRS-5Y", "transaction_type": "SWAP",
             "position": "LONG", "notional": "10000000", "currency": "USD",
             "maturity_date": "2030-01-01", "market_value": "50000", "reference_index": "SOFR"},
            {"asset_class": "INTEREST_RATE", "id": "BASIS-3Y", "transaction_type": "SWAP",
             "position": "SHORT", "notional": "5000000", "currency": "USD",
             "maturity_date": "2028-01-01", "market_value": "-2000",
             "reference_index": "SOFR", "basis_index": "TERM-SOFR-3M"},
            {"asset_class": "FOREIGN_EXCHANGE", "id": "FX-1", "transaction_type": "FORWARD",
             "position": "LONG", "notional": "3000000", "maturity_date": "2025-07-01",
             "market_value": "15000", "currency_pair": "EUR/USD"},
            {"asset_class": "CREDIT", "id": "CDS-1", "transaction_type": "CREDIT_DEFAULT_SWAP",
             "position": "LONG", "notional": "2000000", "maturity_date": "2029-12-20",
             "market_value": "-8000", "reference_entity": "ACME", "credit_quality": "BBB"},
            {"asset_class": "EQUITY", "id": "EQ-1", "transaction_type": "TOTAL_RETURN_SWAP",
             "position": "SHORT", "notional": "1000000", "maturity_date": "2026-01-01",
             "market_value": "4000", "issuer": "SPX", "is_index": true},
            {"asset_class": "COMMODITY", "id": "OIL-1", "transaction_type": "FUTURE",
             "position": "LONG", "notional": "500000", "maturity_date": "2025-12-01",
             "market_value": "1000", "commodity_type": "ENERGY", "commodity_subtype": "OIL_GAS"}
        ]
    }"#,
    )
    .unwrap()
}

#[test]
fn test_mixed_book_ead_identity() {
    let out = calculate_sa_ccr(&mixed_book()).unwrap().result;
    assert_eq!(out.ead, dec!(1.4) * (out.replacement_cost + out.multiplier * out.add_on));
    assert_eq!(out.pfe, out.multiplier * out.add_on);
    assert_eq!(out.net_market_value, dec!(60000));
    assert_eq!(out.replacement_cost, dec!(60000));
    assert_eq!(out.per_asset_class_add_on.len(), 5);
    for class in AssetClass::ALL {
        assert!(out.per_asset_class_add_on[&class] > Decimal::ZERO, "{:?}", class);
    }
    let total: Decimal = out.per_asset_class_add_on.values().copied().sum();
    assert_eq!(total, out.add_on);
    assert_eq!(out.trade_details.len(), 6);
}

#[test]
fn test_basis_swap_gets_own_hedging_set_with_half_factor() {
    let out = calculate_sa_ccr(&mixed_book()).unwrap().result;
    let basis = out
        .trade_details
        .iter()
        .find(|t| t.trade_id == "BASIS-3Y")
        .unwrap();
    assert_eq!(basis.supervisory_factor, dec!(0.0025));
    assert_eq!(basis.hedging_set, "USD:SOFR/TERM-SOFR-3M");
    let ir_sets: Vec<_> = out
        .hedging_sets
        .iter()
        .filter(|h| h.asset_class == AssetClass::InterestRate)
        .collect();
    assert_eq!(ir_sets.len(), 2);
}

#[test]
fn test_inverted_fx_pair_offsets_same_position() {
    let input: SaCcrInput = serde_json::from_str(
        r#"{
        "netting_set": {"id": "FX"},
        "valuation_date": "2025-01-01",
        "trades": [
            {"asset_class": "FOREIGN_EXCHANGE", "id": "A", "transaction_type": "FORWARD",
             "position": "LONG", "notional": "1000000", "maturity_date": "2026-06-01",
             "market_value": "100", "currency_pair": "EURUSD"},
            {"asset_class": "FOREIGN_EXCHANGE", "id": "B", "transaction_type": "FORWARD",
             "position": "LONG", "notional": "1000000", "maturity_date": "2026-06-01",
             "market_value": "100", "currency_pair": "usd/eur"}
        ]
    }"#,
    )
    .unwrap();
    let out = calculate_sa_ccr(&input).unwrap().result;
    assert_eq!(out.hedging_sets.len(), 1);
    assert_eq!(out.hedging_sets[0].hedging_set, "EURUSD");
    assert_eq!(out.add_on, Decimal::ZERO);
    assert_eq!(out.multiplier, Decimal::ONE);
    assert_eq!(out.ead, dec!(280));
}

#[test]
fn test_swapped_parameter_table() {
    let mut params = SaCcrParameters::default();
    params.alpha = Decimal::ONE;
    params.version = "test table".into();
    let output = calculate_sa_ccr_with(&mixed_book(), &params).unwrap();
    assert_eq!(output.metadata.framework, "test table");
    let r = output.result;
    assert_eq!(r.ead, r.replacement_cost + r.pfe);
}

#[test]
fn test_maturity_before_start_rejected() {
    let input: SaCcrInput = serde_json::from_str(
        r#"{
        "netting_set": {"id": "NS"},
        "valuation_date": "2025-01-01",
        "trades": [
            {"asset_class": "EQUITY", "id": "E1", "transaction_type": "FORWARD",
             "position": "LONG", "notional": "100", "start_date": "2026-01-01",
             "maturity_date": "2025-06-01", "market_value": "0", "issuer": "X"}
        ]
    }"#,
    )
    .unwrap();
    let err = calculate_sa_ccr(&input).unwrap_err();
    assert!(
        matches!(err, CcrMarginError::InvalidInput { ref field, .. } if field == "trades[0:E1].maturity_date")
    );
}

#[test]
fn test_forward_starting_trade_uses_start_in_duration() {
    let input: SaCcrInput = serde_json::from_str(
        r#"{
        "netting_set": {"id": "NS"},
        "valuation_date": "2025-01-01",
        "trades": [
            {"asset_class": "INTEREST_RATE", "id": "FWD", "transaction_type": "SWAP",
             "position": "LONG", "notional": "1000000", "start_date": "2026-01-01",
             "maturity_date": "2031-01-01", "market_value": "0", "reference_index": "SOFR"}
        ]
    }"#,
    )
    .unwrap();
    let out = calculate_sa_ccr(&input).unwrap().result;
    let sd = out.trade_details[0].supervisory_duration.unwrap();
    // S = 1, E = 2191 / 365
    assert!((sd - dec!(4.21025)).abs() < dec!(0.0001), "sd {}", sd);
}

#[test]
fn test_output_serialises_asset_class_keys() {
    let out = calculate_sa_ccr(&mixed_book()).unwrap();
    let json = serde_json::to_value(&out).unwrap();
    assert!(json["result"]["per_asset_class_add_on"]["INTEREST_RATE"].is_string());
    assert_eq!(json["metadata"]["framework"], "Basel III SA-CCR (CRE52)");
}

#[test]
fn test_large_notional_in_trade_currency_computes() {
    // One quadrillion rupiah; add-on squares exceed the decimal range
    let input: SaCcrInput = serde_json::from_str(
        r#"{
        "netting_set": {"id": "CPTY-IDR"},
        "valuation_date": "2025-01-01",
        "trades": [
            {"asset_class": "EQUITY", "id": "EQ-FWD", "transaction_type": "FORWARD",
             "position": "LONG", "notional": "1000000000000000", "currency": {"Other": "IDR"},
             "maturity_date": "2026-01-01", "market_value": "0", "issuer": "BBCA"}
        ]
    }"#,
    )
    .unwrap();
    let out = calculate_sa_ccr(&input).unwrap().result;
    let expected_add_on = dec!(320000000000000);
    assert!(((out.add_on - expected_add_on) / expected_add_on).abs() < dec!(0.001), "{}", out.add_on);
    assert_eq!(out.multiplier, Decimal::ONE);
    assert_eq!(out.ead, dec!(1.4) * (out.replacement_cost + out.pfe));
}
