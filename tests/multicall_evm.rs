mod support;

use alloy_primitives::U256;
use serde_json::{json, Value};
use snapshot_scores::abi;
use snapshot_scores::error::ScoreError;
use snapshot_scores::infra::multicall::{self, Abi, BatchOptions, BlockTag, Call, Decoded};
use support::{account, MockProvider, ONE_TOKEN};

const TOKEN: &str = "0x6B175474E89094C44Da98b954EedeAC495271d0F";

fn balance_calls(count: u8) -> Vec<Call> {
    (1..=count)
        .map(|i| Call::new(TOKEN, "balanceOf", vec![Value::String(account(i))]))
        .collect()
}

fn erc20() -> Abi {
    Abi::human_readable([abi::ERC20_BALANCE_OF]).expect("abi must parse")
}

fn tokens(n: u64) -> Decoded {
    Decoded::Uint(U256::from(n) * U256::from(ONE_TOKEN))
}

#[tokio::test]
async fn results_follow_input_order_when_pages_finish_out_of_order() {
    let provider = MockProvider::new().with_delay(0, 40).with_delay(1, 5);
    let abi = erc20();
    let calls = balance_calls(5);

    let results = multicall::multicall(
        "1",
        &provider,
        &abi,
        &calls,
        BatchOptions::default().with_limit(2),
    )
    .await
    .expect("batch must succeed");

    assert_eq!(provider.completion_order().await, vec![2, 1, 0]);
    assert_eq!(results.len(), 5);
    for (i, outputs) in results.iter().enumerate() {
        assert_eq!(outputs, &vec![tokens(i as u64 + 1)]);
    }
}

#[tokio::test]
async fn pages_by_limit_with_a_short_tail() {
    let provider = MockProvider::new();
    let abi = erc20();

    multicall::multicall(
        "1",
        &provider,
        &abi,
        &balance_calls(7),
        BatchOptions::default().with_limit(3),
    )
    .await
    .expect("batch must succeed");

    assert_eq!(provider.page_sizes().await, vec![3, 3, 1]);
}

#[tokio::test]
async fn zero_limit_sends_one_call_per_page() {
    let provider = MockProvider::new();
    let abi = erc20();

    multicall::multicall(
        "1",
        &provider,
        &abi,
        &balance_calls(3),
        BatchOptions::default().with_limit(0),
    )
    .await
    .expect("batch must succeed");

    assert_eq!(provider.page_sizes().await, vec![1, 1, 1]);
}

#[tokio::test]
async fn one_failing_page_fails_the_batch() {
    let provider = MockProvider::new().failing_page(1);
    let abi = erc20();

    let err = multicall::multicall(
        "1",
        &provider,
        &abi,
        &balance_calls(6),
        BatchOptions::default().with_limit(2),
    )
    .await
    .expect_err("batch must fail");

    match err {
        ScoreError::BatchExecution { page, source } => {
            assert_eq!(page, 1);
            assert!(matches!(*source, ScoreError::RpcError(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn reverting_call_fails_its_page() {
    let provider = MockProvider::new();
    let abi = Abi::human_readable(["function totalSupply() view returns (uint256)"])
        .expect("abi must parse");

    let err = multicall::multicall(
        "1",
        &provider,
        &abi,
        &[Call::new(TOKEN, "totalSupply", vec![])],
        BatchOptions::default(),
    )
    .await
    .expect_err("revert must surface");

    assert!(matches!(err, ScoreError::BatchExecution { page: 0, .. }));
}

#[tokio::test]
async fn pinned_block_is_forwarded_and_repeatable() {
    let provider = MockProvider::new();
    let abi = erc20();
    let calls = balance_calls(4);
    let options = BatchOptions::at(BlockTag::Number(17_000_000)).with_limit(2);

    let first = multicall::multicall("1", &provider, &abi, &calls, options.clone())
        .await
        .expect("first run");
    let second = multicall::multicall("1", &provider, &abi, &calls, options)
        .await
        .expect("second run");

    assert_eq!(first, second);
    let pages = provider.pages().await;
    assert_eq!(pages.len(), 4);
    assert!(pages
        .iter()
        .all(|p| p.block == BlockTag::Number(17_000_000)));
}

#[tokio::test]
async fn address_casing_does_not_change_calldata() {
    let provider = MockProvider::new();
    let abi = erc20();
    let mixed = account(9);
    let lower = mixed.to_lowercase();
    assert_ne!(mixed, lower);

    for (target, holder) in [(TOKEN.to_string(), mixed), (TOKEN.to_lowercase(), lower)] {
        multicall::multicall(
            "1",
            &provider,
            &abi,
            &[Call::new(target, "balanceOf", vec![json!(holder)])],
            BatchOptions::default(),
        )
        .await
        .expect("batch must succeed");
    }

    let pages = provider.pages().await;
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].data, pages[1].data);
}

#[tokio::test]
async fn unknown_aggregator_fails_before_any_request() {
    let provider = MockProvider::new();
    let abi = erc20();

    let err = multicall::multicall("424242", &provider, &abi, &balance_calls(2), BatchOptions::default())
        .await
        .expect_err("network has no aggregator");

    assert!(matches!(
        err,
        ScoreError::MissingMulticallAddress { ref network } if network == "424242"
    ));
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn explicit_aggregator_overrides_the_registry() {
    let provider = MockProvider::new();
    let abi = erc20();
    let custom = "0x1111111111111111111111111111111111111111";

    multicall::multicall(
        "424242",
        &provider,
        &abi,
        &balance_calls(1),
        BatchOptions::default().with_multicall_address(custom),
    )
    .await
    .expect("override must be used");

    let pages = provider.pages().await;
    assert_eq!(pages[0].to.to_lowercase(), custom);
}

#[tokio::test]
async fn bad_argument_fails_before_any_request() {
    let provider = MockProvider::new();
    let abi = erc20();
    let calls = vec![
        Call::new(TOKEN, "balanceOf", vec![json!(account(1))]),
        Call::new(TOKEN, "balanceOf", vec![json!("not-an-address")]),
    ];

    let err = multicall::multicall("1", &provider, &abi, &calls, BatchOptions::default())
        .await
        .expect_err("argument must be rejected");

    assert!(matches!(err, ScoreError::Abi(_)));
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn empty_batch_sends_nothing() {
    let provider = MockProvider::new();
    let abi = erc20();

    let results = multicall::multicall("1", &provider, &abi, &[], BatchOptions::default())
        .await
        .expect("empty batch");

    assert!(results.is_empty());
    assert_eq!(provider.request_count(), 0);
}
