//! Precondition failures never reach the network

use super::test_helpers::{paused_runtime, Harness};
use crate::registry::{PRODUCTION_USDC_MINT, TEST_USDC_MINT};
use crate::test_utils::{off_curve_address, on_curve_address, MockWallet};
use crate::transfer::TransferError;
use crate::types::{AssetKind, Network, TransferRequest};
use proptest::prelude::*;

fn run(h: &Harness, request: &TransferRequest) -> TransferError {
    paused_runtime()
        .block_on(h.orchestrator().transfer(request))
        .expect_err("request should be rejected")
}

#[test]
fn test_malformed_requests_make_no_calls() {
    let cases: Vec<(TransferRequest, &str)> = vec![
        (
            TransferRequest::new("", AssetKind::Native, 1.0, Network::Test),
            "INVALID_ADDRESS",
        ),
        (
            TransferRequest::new("0xdeadbeef", AssetKind::FungibleToken, 1.0, Network::Test),
            "INVALID_ADDRESS",
        ),
        (
            TransferRequest::new(off_curve_address().to_string(), AssetKind::Native, 1.0, Network::Test),
            "UNSUPPORTED_RECIPIENT",
        ),
        (
            TransferRequest::new(TEST_USDC_MINT, AssetKind::FungibleToken, 1.0, Network::Test),
            "RECIPIENT_IS_MINT",
        ),
        (
            TransferRequest::new(on_curve_address().to_string(), AssetKind::Native, 0.0, Network::Test),
            "INVALID_AMOUNT",
        ),
        (
            TransferRequest::new(on_curve_address().to_string(), AssetKind::FungibleToken, f64::NAN, Network::Test),
            "INVALID_AMOUNT",
        ),
    ];

    for (request, code) in cases {
        let h = Harness::new(Network::Test);
        let err = run(&h, &request);
        assert_eq!(err.code(), code, "{:?}", request);
        assert!(err.is_precondition());
        h.assert_no_network_calls();
    }
}

#[test]
fn test_production_mint_rejected_on_production() {
    let h = Harness::new(Network::Production);
    let request = TransferRequest::new(PRODUCTION_USDC_MINT, AssetKind::FungibleToken, 1.0, Network::Production);
    assert_eq!(run(&h, &request).code(), "RECIPIENT_IS_MINT");
    h.assert_no_network_calls();
}

#[test]
fn test_self_transfer_to_connected_wallet() {
    let h = Harness::new(Network::Test);
    let request = TransferRequest::new(h.sender().to_string(), AssetKind::FungibleToken, 1.0, Network::Test);
    assert_eq!(run(&h, &request), TransferError::SelfTransferDenied);
    h.assert_no_network_calls();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_self_transfer_always_denied(token in any::<bool>(), amount in 0.000001f64..1_000.0) {
        let sender = on_curve_address();
        let asset = if token { AssetKind::FungibleToken } else { AssetKind::Native };
        let h = Harness::new(Network::Test);
        let request = TransferRequest::new(sender.to_string(), asset, amount, Network::Test)
            .with_sender(sender);

        prop_assert_eq!(run(&h, &request), TransferError::SelfTransferDenied);
        prop_assert_eq!(h.wallet.submission_count(), 0);
        prop_assert_eq!(h.rpc.account_query_count(), 0);
    }

    #[test]
    fn prop_off_curve_native_recipient_rejected(amount in 0.000001f64..1_000.0) {
        let h = Harness::new(Network::Test);
        let request = TransferRequest::new(off_curve_address().to_string(), AssetKind::Native, amount, Network::Test);

        prop_assert_eq!(run(&h, &request).code(), "UNSUPPORTED_RECIPIENT");
        prop_assert_eq!(h.wallet.submission_count(), 0);
    }

    #[test]
    fn prop_non_positive_amount_rejected(amount in prop_oneof![Just(0.0f64), -1.0e12f64..=0.0]) {
        let h = Harness::new(Network::Test);
        let request = TransferRequest::new(on_curve_address().to_string(), AssetKind::Native, amount, Network::Test);

        prop_assert_eq!(run(&h, &request).code(), "INVALID_AMOUNT");
        prop_assert_eq!(h.rpc.account_query_count(), 0);
        prop_assert_eq!(h.blockhash.call_count(), 0);
    }

    #[test]
    fn prop_garbage_recipient_rejected(recipient in "[^1-9A-HJ-NP-Za-km-z]{1,60}") {
        let h = Harness::new(Network::Test);
        let request = TransferRequest::new(recipient, AssetKind::FungibleToken, 1.0, Network::Test);

        prop_assert_eq!(run(&h, &request).code(), "INVALID_ADDRESS");
        prop_assert_eq!(h.builder.build_count(), 0);
    }
}

#[test]
fn test_unready_wallet_beats_invalid_request() {
    let h = Harness::new(Network::Test).with_wallet(MockWallet::without_identity(Network::Test));
    let request = TransferRequest::new("", AssetKind::Native, -1.0, Network::Test);
    assert_eq!(run(&h, &request), TransferError::WalletNotReady);
    h.assert_no_network_calls();
}
