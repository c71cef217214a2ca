use catbridge_aggregation::{aggregate_deposits, aggregate_withdrawals, WithdrawalAggregation};
use catbridge_bridge::{deploy, settle_deposits, settle_withdrawals, BridgeUtxo};
use catbridge_crypto::OperatorKeys;
use catbridge_test_utils::{deposits, withdrawals};
use catbridge_txbuilder::BuildContext;

pub(crate) const DEPOSITS: [u64; 4] = [1_329, 1_400, 1_500, 1_888];
pub(crate) const WITHDRAWALS: [u64; 4] = [1_000, 800, 700, 997];

/// Deploys, settles [`DEPOSITS`] and then settles [`WITHDRAWALS`].
pub(crate) fn settled_withdrawals(
    ctx: &mut BuildContext<'_>,
    keys: &OperatorKeys,
) -> (BridgeUtxo, WithdrawalAggregation) {
    let bridge = deploy(ctx).unwrap();
    let batch = aggregate_deposits(ctx, &deposits(keys, &DEPOSITS)).unwrap();
    let bridge = settle_deposits(ctx, &bridge, &batch).unwrap();
    let batch = aggregate_withdrawals(ctx, &withdrawals(keys, &WITHDRAWALS)).unwrap();
    let bridge = settle_withdrawals(ctx, &bridge, &batch).unwrap();
    (bridge, batch)
}
