#[cfg(test)]
mod test {

    use crate::ladder::RateLadder;
    use crate::ledger::packing::{
        account_assets_elements, ledger_commitment, ledger_elements, pack_tier_pair, pack_triple,
        unpack_tier_pair, unpack_triple,
    };
    use crate::ledger::{
        densify, parse_csv_to_ledger, AccountAsset, AssetLedgerEntry, CollateralKind,
    };
    use crate::params::{
        account_assets_elements as elements_count, LEDGER_ELEMENTS_PER_ASSET, TIER_VALUE_MULTIPLIER,
    };
    use crate::utils::hash::poseidon_sequence;

    fn sample_entry() -> AssetLedgerEntry {
        let ladder = RateLadder::new(&[(100, 100), (1000, 50)]).unwrap();
        let mut entry = AssetLedgerEntry::new(
            "btc",
            27_000,
            [ladder.clone(), ladder.clone(), RateLadder::inactive()],
        );
        entry.total_equity = 1_000;
        entry.total_debt = u64::MAX;
        entry.vip_loan_collateral = 200;
        entry
    }

    #[test]
    fn test_triple_round_trip() {
        let packed = pack_triple(u64::MAX, 7, 0);
        assert_eq!(unpack_triple(&packed), Some((u64::MAX, 7, 0)));

        let entry = sample_entry();
        let elements = ledger_elements(&entry);
        assert_eq!(
            unpack_triple(&elements[0]),
            Some((entry.total_equity, entry.total_debt, entry.base_price))
        );
        assert_eq!(
            unpack_triple(&elements[1]),
            Some((
                entry.vip_loan_collateral,
                entry.margin_collateral,
                entry.portfolio_margin_collateral
            ))
        );
    }

    #[test]
    fn test_tier_pair_round_trip() {
        let ladder = RateLadder::new(&[
            (100, 100),
            (1000, 50),
            ((1u128 << 117) + 3, 7),
            ((1u128 << 118) - 1, 1),
        ])
        .unwrap();
        let tiers = ladder.tiers();

        for pair in [0, 2] {
            let packed = pack_tier_pair(&tiers[pair], &tiers[pair + 1]);
            assert_eq!(
                unpack_tier_pair(&packed),
                Some((
                    (tiers[pair].boundary, tiers[pair].ratio),
                    (tiers[pair + 1].boundary, tiers[pair + 1].ratio)
                ))
            );
        }

        // the padding sentinel does not survive the packing
        let packed = pack_tier_pair(&tiers[4], &tiers[5]);
        assert_ne!(
            unpack_tier_pair(&packed),
            Some((
                (tiers[4].boundary, tiers[4].ratio),
                (tiers[5].boundary, tiers[5].ratio)
            ))
        );
    }

    #[test]
    fn test_ledger_elements_layout() {
        let entry = sample_entry();
        let elements = ledger_elements(&entry);
        assert_eq!(elements.len(), LEDGER_ELEMENTS_PER_ASSET);

        let tiers = entry.ladder(CollateralKind::Margin).tiers();
        assert_eq!(elements[2 + 5], pack_tier_pair(&tiers[0], &tiers[1]));
    }

    #[test]
    fn test_ledger_commitment_pads_universe() {
        let ledger = vec![sample_entry()];
        let padded = vec![sample_entry(), AssetLedgerEntry::empty()];
        assert_eq!(ledger_commitment(&ledger, 2), ledger_commitment(&padded, 2));
        assert_ne!(ledger_commitment(&ledger, 1), ledger_commitment(&ledger, 2));

        let mut elements = ledger_elements(&sample_entry());
        elements.extend(ledger_elements(&AssetLedgerEntry::empty()));
        assert_eq!(ledger_commitment(&ledger, 2), poseidon_sequence(&elements));
    }

    #[test]
    fn test_account_assets_elements() {
        let assets = vec![AccountAsset {
            index: 1,
            equity: 10,
            debt: 2,
            vip_loan: 3,
            margin: 4,
            portfolio_margin: 1,
        }];

        let elements = account_assets_elements(&assets, 2);
        assert_eq!(elements.len(), elements_count(2));
        // asset 0 is zero-filled: [0, 0, 0], [0, 0, 10], [2, 3, 4], [1, 0, 0]
        assert_eq!(elements[0], pack_triple(0, 0, 0));
        assert_eq!(elements[1], pack_triple(0, 0, 10));
        assert_eq!(elements[2], pack_triple(2, 3, 4));
        assert_eq!(elements[3], pack_triple(1, 0, 0));
    }

    #[test]
    fn test_densify() {
        let assets = vec![AccountAsset {
            index: 2,
            equity: 5,
            ..AccountAsset::default()
        }];
        let dense = densify(&assets, 3);
        assert_eq!(dense.len(), 3);
        assert_eq!(dense[0], AccountAsset::zero(0));
        assert_eq!(dense[2].equity, 5);
    }

    #[test]
    fn test_checked_accumulate() {
        let entry = sample_entry();
        let asset = AccountAsset {
            index: 0,
            equity: 1,
            ..AccountAsset::default()
        };
        let next = entry.checked_accumulate(&asset).unwrap();
        assert_eq!(next.total_equity, 1_001);
        assert_eq!(next.vip_loan_ladder, entry.vip_loan_ladder);

        let overflowing = AccountAsset {
            index: 0,
            debt: 1,
            ..AccountAsset::default()
        };
        assert_eq!(entry.checked_accumulate(&overflowing), None);
    }

    #[test]
    fn test_parse_csv_to_ledger() {
        let ledger = parse_csv_to_ledger("src/ledger/csv/ledger_2.csv").unwrap();
        assert_eq!(ledger.len(), 2);

        assert_eq!(ledger[0].symbol, "btc");
        assert_eq!(ledger[0].base_price, 2_700_012_345_678);
        assert_eq!(ledger[0].total_equity, 0);
        assert_eq!(
            ledger[0].vip_loan_ladder,
            RateLadder::new(&[
                (100 * TIER_VALUE_MULTIPLIER, 100),
                (1000 * TIER_VALUE_MULTIPLIER, 50)
            ])
            .unwrap()
        );
        assert_eq!(ledger[0].portfolio_margin_ladder, RateLadder::new(&[]).unwrap());

        assert_eq!(ledger[1].base_price, 165_050_000_000);
        assert_eq!(ledger[1].margin_ladder, RateLadder::new(&[]).unwrap());
    }
}
