use daiv_ledger::{MintReason, Minter, TokenLedger};
use daiv_types::{AccountId, DatasetId, Timestamp, TokenAmount};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Transfer { from: usize, to: usize, amount: u64 },
    Deposit { owner: usize, amount: u64 },
    Payout { to: usize, amount: u64 },
    Mint { to: usize, amount: u64 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..4usize, 0..4usize, 0..500u64).prop_map(|(from, to, amount)| Op::Transfer {
            from,
            to,
            amount
        }),
        (0..4usize, 0..200u64).prop_map(|(owner, amount)| Op::Deposit { owner, amount }),
        (0..4usize, 0..200u64).prop_map(|(to, amount)| Op::Payout { to, amount }),
        (0..4usize, 0..100u64).prop_map(|(to, amount)| Op::Mint { to, amount }),
    ]
}

fn accounts() -> Vec<AccountId> {
    (0..4).map(|i| AccountId::new(format!("acct{i}"))).collect()
}

proptest! {
    /// Supply only changes by minting; transfers and escrow movements conserve it.
    #[test]
    fn supply_equals_genesis_plus_minted(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let ids = accounts();
        let mut ledger = TokenLedger::new([Minter::Registry, Minter::Timelock], 10);
        for id in &ids {
            ledger.allocate_genesis(id, TokenAmount::new(250), 1).unwrap();
        }
        let genesis = ledger.total_supply();

        for op in ops {
            let _ = match op {
                Op::Transfer { from, to, amount } => {
                    ledger.transfer(&ids[from], &ids[to], TokenAmount::from(amount))
                }
                Op::Deposit { owner, amount } => {
                    ledger.escrow_deposit(&ids[owner], TokenAmount::from(amount))
                }
                Op::Payout { to, amount } => {
                    ledger.escrow_payout(&ids[to], TokenAmount::from(amount))
                }
                Op::Mint { to, amount } => ledger
                    .mint(
                        &ids[to],
                        TokenAmount::from(amount),
                        &Minter::Registry,
                        MintReason::Base { dataset: DatasetId::new(1) },
                        Timestamp::EPOCH,
                    )
                    .map(|_| ()),
            };
            prop_assert_eq!(
                ledger.total_supply(),
                genesis.saturating_add(ledger.total_minted())
            );
        }
    }

    /// A transfer either succeeds in full or leaves both balances untouched.
    #[test]
    fn transfer_is_all_or_nothing(start in 0..1_000u64, amount in 0..2_000u64) {
        let ids = accounts();
        let mut ledger = TokenLedger::new([Minter::Registry], 10);
        ledger.allocate_genesis(&ids[0], TokenAmount::from(start), 0).unwrap();
        let result = ledger.transfer(&ids[0], &ids[1], TokenAmount::from(amount));
        if amount <= start {
            prop_assert!(result.is_ok());
            prop_assert_eq!(ledger.balance(&ids[1]), TokenAmount::from(amount));
        } else {
            prop_assert!(result.is_err());
            prop_assert_eq!(ledger.balance(&ids[0]), TokenAmount::from(start));
            prop_assert_eq!(ledger.balance(&ids[1]), TokenAmount::ZERO);
        }
    }
}
