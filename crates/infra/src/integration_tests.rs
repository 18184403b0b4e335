//! End-to-end scenarios over the in-memory Ledger Store.
//!
//! Services → runner → store, with stock only ever arriving through ENTRY
//! movements so that every product's counter can be checked against its
//! ledger at the end of each scenario.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;

    use backoffice_core::{
        ClientId, DomainError, Money, MovementId, ProductId, SaleId, SupplierId, UserId,
    };
    use backoffice_inventory::{MovementType, MovementUpdate, RecordMovement, reason};
    use backoffice_parties::{Client, Supplier};
    use backoffice_products::{NewPrice, PriceUpdate, Product};
    use backoffice_sales::{CreateSale, SaleLine, UpdateSale};
    use proptest::prelude::*;

    use crate::config::TransactionConfig;
    use crate::error::{LedgerError, StoreError, StoreResult};
    use crate::services::{Clients, LedgerServices, Products, SaleCoordinator, Suppliers};
    use crate::store::{InMemoryLedgerStore, LedgerStore, LedgerTx};

    struct Fixture {
        store: InMemoryLedgerStore,
        services: LedgerServices,
        supplier: SupplierId,
        client: ClientId,
        user: UserId,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = InMemoryLedgerStore::new();
            let supplier = Supplier::new("Acme Wholesale");
            let client = Client::new("Jane Doe");

            let mut tx = store.begin().await.unwrap();
            tx.insert_supplier(&supplier).await.unwrap();
            tx.insert_client(&client).await.unwrap();
            tx.commit().await.unwrap();

            Self {
                services: LedgerServices::new(Arc::new(store.clone()), TransactionConfig::default()),
                store,
                supplier: supplier.id,
                client: client.id,
                user: UserId::new(),
            }
        }

        /// A product with a current selling price of 2.50 and `stock` units
        /// delivered by the fixture supplier.
        async fn product(&self, stock: i64) -> ProductId {
            self.product_with_thresholds(stock, 0, None).await
        }

        async fn product_with_thresholds(&self, stock: i64, min: i64, max: Option<i64>) -> ProductId {
            let product = Product::new("Widget", self.supplier, min, max).unwrap();
            let mut tx = self.store.begin().await.unwrap();
            tx.insert_product(&product).await.unwrap();
            tx.commit().await.unwrap();

            self.services
                .prices
                .create(NewPrice {
                    product_id: product.id,
                    purchase_price: Money::from_cents(150),
                    selling_price: Money::from_cents(250),
                    is_current: true,
                })
                .await
                .unwrap();
            if stock > 0 {
                self.deliver(product.id, stock).await.unwrap();
            }
            product.id
        }

        async fn deliver(&self, product_id: ProductId, quantity: i64) -> Result<i64, LedgerError> {
            let recorded = self
                .services
                .movements
                .record(RecordMovement {
                    movement_type: MovementType::Entry,
                    quantity,
                    product_id,
                    supplier_id: Some(self.supplier),
                    sale_id: None,
                    user_id: self.user,
                    reason: Some("delivery".into()),
                    notes: None,
                })
                .await?;
            Ok(recorded.product.current_stock)
        }

        fn sale(&self, lines: Vec<SaleLine>) -> CreateSale {
            CreateSale {
                client_id: self.client,
                user_id: self.user,
                lines,
            }
        }

        async fn stock(&self, product_id: ProductId) -> i64 {
            self.services
                .flags
                .find_by_id::<Products>(product_id)
                .await
                .unwrap()
                .current_stock
        }

        async fn assert_ledger_consistent(&self) {
            for report in self.services.alerts.reconcile_all().await.unwrap() {
                assert!(report.consistent, "ledger drift: {report:?}");
            }
        }
    }

    #[tokio::test]
    async fn selling_all_stock_leaves_zero_and_one_exit() {
        let fx = Fixture::new().await;
        let product = fx.product(10).await;

        let sale = fx
            .services
            .sales
            .create(fx.sale(vec![SaleLine::new(product, 10)]))
            .await
            .unwrap();

        assert_eq!(fx.stock(product).await, 0);
        assert_eq!(sale.total_amount, Money::from_cents(2500));

        let movements = fx.services.movements.for_sale(sale.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::Exit);
        assert_eq!(movements[0].quantity, 10);
        assert_eq!(movements[0].sale_id, Some(sale.id));
        assert_eq!(movements[0].reason.as_deref(), Some(reason::SALE));
        fx.assert_ledger_consistent().await;
    }

    #[tokio::test]
    async fn sale_on_empty_stock_reports_available_quantity() {
        let fx = Fixture::new().await;
        let product = fx.product(0).await;

        let err = fx
            .services
            .sales
            .create(fx.sale(vec![SaleLine::new(product, 1)]))
            .await
            .unwrap_err();

        match err.as_domain() {
            Some(DomainError::InsufficientStock { available, .. }) => assert_eq!(*available, 0),
            other => panic!("Expected InsufficientStock, got {other:?}"),
        }
        assert!(err.to_string().contains("Available: 0"));
        assert!(fx.services.movements.for_product(product).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_later_line_leaves_no_trace() {
        let fx = Fixture::new().await;
        let plenty = fx.product(10).await;
        let scarce = fx.product(1).await;

        let err = fx
            .services
            .sales
            .create(fx.sale(vec![
                SaleLine::new(plenty, 3),
                SaleLine::new(plenty, 2),
                SaleLine::new(scarce, 2),
            ]))
            .await
            .unwrap_err();

        assert!(matches!(err.as_domain(), Some(DomainError::InsufficientStock { .. })));
        assert_eq!(fx.stock(plenty).await, 10);
        assert_eq!(fx.stock(scarce).await, 1);
        // Only the delivery is on each ledger.
        assert_eq!(fx.services.movements.for_product(plenty).await.unwrap().len(), 1);
        assert_eq!(fx.services.movements.for_product(scarce).await.unwrap().len(), 1);
        fx.assert_ledger_consistent().await;
    }

    #[tokio::test]
    async fn unknown_product_or_client_rejects_the_sale() {
        let fx = Fixture::new().await;
        let product = fx.product(5).await;

        let err = fx
            .services
            .sales
            .create(fx.sale(vec![
                SaleLine::new(product, 1),
                SaleLine::new(ProductId::new(), 1),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::NotFound { .. })));

        let mut cmd = fx.sale(vec![SaleLine::new(product, 1)]);
        cmd.client_id = ClientId::new();
        let err = fx.services.sales.create(cmd).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::NotFound { .. })));

        assert_eq!(fx.stock(product).await, 5);
    }

    #[tokio::test]
    async fn cancel_restores_stock_and_removes_the_sale() {
        let fx = Fixture::new().await;
        let product = fx.product(8).await;
        let sale = fx
            .services
            .sales
            .create(fx.sale(vec![SaleLine::new(product, 3), SaleLine::new(product, 2)]))
            .await
            .unwrap();
        assert_eq!(fx.stock(product).await, 3);

        let cancelled_by = UserId::new();
        let removed = fx.services.sales.cancel(sale.id, cancelled_by).await.unwrap();
        assert_eq!(removed.id, sale.id);
        assert_eq!(fx.stock(product).await, 8);

        let err = fx.services.sales.get(sale.id).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::NotFound { .. })));

        let movements = fx.services.movements.for_sale(sale.id).await.unwrap();
        let reversals: Vec<_> = movements
            .iter()
            .filter(|m| m.movement_type == MovementType::Entry)
            .collect();
        assert_eq!(reversals.len(), 2);
        assert!(reversals.iter().all(|m| {
            m.reason.as_deref() == Some(reason::SALE_CANCELLATION)
                && m.supplier_id.is_none()
                && m.user_id == cancelled_by
        }));
        fx.assert_ledger_consistent().await;

        let err = fx.services.sales.cancel(sale.id, cancelled_by).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn sale_update_only_changes_the_client() {
        let fx = Fixture::new().await;
        let product = fx.product(4).await;
        let sale = fx
            .services
            .sales
            .create(fx.sale(vec![SaleLine::new(product, 2)]))
            .await
            .unwrap();

        let other = Client::new("John Roe");
        let mut tx = fx.store.begin().await.unwrap();
        tx.insert_client(&other).await.unwrap();
        tx.commit().await.unwrap();

        let updated = fx
            .services
            .sales
            .update(sale.id, UpdateSale { client_id: Some(other.id) })
            .await
            .unwrap();
        assert_eq!(updated.client_id, other.id);
        assert_eq!(updated.total_amount, sale.total_amount);
        assert_eq!(fx.services.sales.get(sale.id).await.unwrap().client_id, other.id);
        assert_eq!(fx.stock(product).await, 2);

        let err = fx
            .services
            .sales
            .update(sale.id, UpdateSale { client_id: Some(ClientId::new()) })
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn entry_without_supplier_is_invalid() {
        let fx = Fixture::new().await;
        let product = fx.product(0).await;

        let err = fx
            .services
            .movements
            .record(RecordMovement {
                movement_type: MovementType::Entry,
                quantity: 5,
                product_id: product,
                supplier_id: None,
                sale_id: None,
                user_id: fx.user,
                reason: None,
                notes: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_domain(), Some(DomainError::InvalidArgument(_))));
        assert_eq!(fx.stock(product).await, 0);
    }

    #[tokio::test]
    async fn manual_exit_beyond_stock_is_refused() {
        let fx = Fixture::new().await;
        let product = fx.product(2).await;

        let exit = |quantity| RecordMovement {
            movement_type: MovementType::Exit,
            quantity,
            product_id: product,
            supplier_id: None,
            sale_id: None,
            user_id: fx.user,
            reason: Some("breakage".into()),
            notes: None,
        };

        let err = fx.services.movements.record(exit(3)).await.unwrap_err();
        assert!(err.to_string().contains("Available: 2"));

        let recorded = fx.services.movements.record(exit(2)).await.unwrap();
        assert_eq!(recorded.product.current_stock, 0);
        fx.assert_ledger_consistent().await;
    }

    #[tokio::test]
    async fn movements_only_accept_note_changes() {
        let fx = Fixture::new().await;
        let product = fx.product(5).await;
        let movement = fx.services.movements.for_product(product).await.unwrap()[0].clone();

        let err = fx
            .services
            .movements
            .update(
                movement.id,
                MovementUpdate {
                    quantity: Some(50),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::InvalidArgument(_))));

        let updated = fx
            .services
            .movements
            .update(
                movement.id,
                MovementUpdate {
                    notes: Some("pallet 7".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.notes.as_deref(), Some("pallet 7"));
        assert_eq!(updated.quantity, movement.quantity);
        assert_eq!(fx.stock(product).await, 5);

        let err = fx.services.movements.delete(movement.id).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::InvalidArgument(_))));
        assert!(fx.services.movements.get(movement.id).await.is_ok());
    }

    #[tokio::test]
    async fn new_current_price_demotes_the_previous_one() {
        let fx = Fixture::new().await;
        let product = fx.product(0).await;
        let first = fx.services.prices.current_price(product).await.unwrap().unwrap();

        let new_price = |cents| NewPrice {
            product_id: product,
            purchase_price: Money::from_cents(100),
            selling_price: Money::from_cents(cents),
            is_current: true,
        };
        let second = fx.services.prices.create(new_price(300)).await.unwrap();
        let third = fx.services.prices.create(new_price(350)).await.unwrap();

        let current = fx.services.prices.current_price(product).await.unwrap().unwrap();
        assert_eq!(current.id, third.id);

        let history = fx.services.prices.history(product).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history.iter().filter(|p| p.is_current_price).count(), 1);
        for old in [first.id, second.id] {
            let old = fx.services.prices.get(old).await.unwrap();
            assert!(!old.is_current_price);
            assert!(old.valid_to.is_some());
        }
    }

    #[tokio::test]
    async fn promoting_an_old_price_swaps_the_current_one() {
        let fx = Fixture::new().await;
        let product = fx.product(0).await;
        let first = fx.services.prices.current_price(product).await.unwrap().unwrap();
        let second = fx
            .services
            .prices
            .create(NewPrice {
                product_id: product,
                purchase_price: Money::from_cents(100),
                selling_price: Money::from_cents(300),
                is_current: true,
            })
            .await
            .unwrap();

        let promoted = fx.services.prices.promote(first.id).await.unwrap();
        assert!(promoted.is_current_price);
        assert!(promoted.valid_to.is_none());
        assert_eq!(promoted.valid_from, first.valid_from);

        let demoted = fx.services.prices.get(second.id).await.unwrap();
        assert!(!demoted.is_current_price);

        let err = fx
            .services
            .prices
            .update(
                first.id,
                PriceUpdate {
                    is_current_price: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn only_non_current_prices_can_be_retired() {
        let fx = Fixture::new().await;
        let product = fx.product(0).await;
        let current = fx.services.prices.current_price(product).await.unwrap().unwrap();

        let err = fx.services.prices.retire(current.id).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::InvalidArgument(_))));

        let draft = fx
            .services
            .prices
            .create(NewPrice {
                product_id: product,
                purchase_price: Money::from_cents(100),
                selling_price: Money::from_cents(400),
                is_current: false,
            })
            .await
            .unwrap();
        fx.services.prices.retire(draft.id).await.unwrap();

        let err = fx.services.prices.get(draft.id).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::NotFound { .. })));
        assert_eq!(
            fx.services.prices.current_price(product).await.unwrap().map(|p| p.id),
            Some(current.id)
        );
    }

    #[tokio::test]
    async fn explicit_line_price_overrides_the_catalog() {
        let fx = Fixture::new().await;
        let product = fx.product(5).await;

        let sale = fx
            .services
            .sales
            .create(fx.sale(vec![
                SaleLine::new(product, 2)
                    .at_price(Money::from_cents(400))
                    .with_discount(Money::from_cents(100)),
            ]))
            .await
            .unwrap();

        assert_eq!(sale.details[0].unit_price, Money::from_cents(400));
        assert_eq!(sale.total_amount, Money::from_cents(700));
        assert!(sale.is_consistent());
    }

    #[tokio::test]
    async fn later_committer_of_a_locked_product_conflicts() {
        let fx = Fixture::new().await;
        let product = fx.product(1).await;

        let mut other = fx.store.begin().await.unwrap();
        other.lock_product(product).await.unwrap();
        assert_eq!(other.apply_stock_delta(product, -1).await.unwrap(), Some(0));

        let sale = fx
            .services
            .sales
            .create(fx.sale(vec![SaleLine::new(product, 1)]))
            .await
            .unwrap();

        let err = other.commit().await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(fx.stock(product).await, 0);
        assert_eq!(fx.services.movements.for_sale(sale.id).await.unwrap().len(), 1);
        fx.assert_ledger_consistent().await;
    }

    /// Commits a one-unit EXIT of `product` right after the first
    /// transaction it hands out has taken its snapshot.
    struct CompetingWriter {
        inner: InMemoryLedgerStore,
        product: ProductId,
        user: UserId,
        armed: AtomicBool,
        begins: AtomicU32,
    }

    #[async_trait]
    impl LedgerStore for CompetingWriter {
        async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
            self.begins.fetch_add(1, Ordering::SeqCst);
            let tx = self.inner.begin().await?;
            if self.armed.swap(false, Ordering::SeqCst) {
                let mut other = self.inner.begin().await?;
                other.lock_product(self.product).await?;
                other.apply_stock_delta(self.product, -1).await?;
                let exit = RecordMovement {
                    movement_type: MovementType::Exit,
                    quantity: 1,
                    product_id: self.product,
                    supplier_id: None,
                    sale_id: None,
                    user_id: self.user,
                    reason: Some("breakage".into()),
                    notes: None,
                }
                .into_movement(MovementId::new(), Utc::now());
                other.insert_movement(&exit).await?;
                other.commit().await?;
            }
            Ok(tx)
        }
    }

    #[tokio::test]
    async fn sale_losing_the_last_unit_mid_flight_is_revalidated() {
        let fx = Fixture::new().await;
        let product = fx.product(1).await;

        let store = Arc::new(CompetingWriter {
            inner: fx.store.clone(),
            product,
            user: fx.user,
            armed: AtomicBool::new(true),
            begins: AtomicU32::new(0),
        });
        let sales = SaleCoordinator::new(store.clone(), TransactionConfig::default());

        let err = sales
            .create(fx.sale(vec![SaleLine::new(product, 1)]))
            .await
            .unwrap_err();

        match err.as_domain() {
            Some(DomainError::InsufficientStock { available, requested, .. }) => {
                assert_eq!((*available, *requested), (0, 1));
            }
            other => panic!("Expected InsufficientStock, got {other:?}"),
        }
        // First attempt conflicted at commit, the retry saw the new stock.
        assert_eq!(store.begins.load(Ordering::SeqCst), 2);
        assert_eq!(fx.stock(product).await, 0);
        assert_eq!(fx.services.movements.for_product(product).await.unwrap().len(), 2);
        fx.assert_ledger_consistent().await;
    }

    #[tokio::test]
    async fn conflict_surfaces_when_no_retry_is_allowed() {
        let fx = Fixture::new().await;
        let product = fx.product(1).await;

        let store = Arc::new(CompetingWriter {
            inner: fx.store.clone(),
            product,
            user: fx.user,
            armed: AtomicBool::new(true),
            begins: AtomicU32::new(0),
        });
        let sales = SaleCoordinator::new(store, TransactionConfig { conflict_retries: 0 });

        let err = sales
            .create(fx.sale(vec![SaleLine::new(product, 1)]))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(fx.stock(product).await, 0);
    }

    #[tokio::test]
    async fn forged_sale_reversal_is_refused() {
        let fx = Fixture::new().await;
        let product = fx.product(4).await;
        let sale = fx
            .services
            .sales
            .create(fx.sale(vec![SaleLine::new(product, 1)]))
            .await
            .unwrap();

        let forged = RecordMovement::sale_reversal(product, 1000, sale.id, fx.user);
        let err = fx.services.movements.record(forged.clone()).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::InvalidArgument(_))));

        let with_supplier = RecordMovement {
            supplier_id: Some(fx.supplier),
            ..forged
        };
        let err = fx.services.movements.record(with_supplier).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::InvalidArgument(_))));

        let sale_exit = RecordMovement::sale_exit(product, 1, sale.id, fx.user);
        assert!(fx.services.movements.record(sale_exit).await.is_err());

        assert_eq!(fx.stock(product).await, 3);
        assert!(fx.services.sales.get(sale.id).await.is_ok());
        assert_eq!(fx.services.movements.for_sale(sale.id).await.unwrap().len(), 1);
        fx.assert_ledger_consistent().await;
    }

    #[tokio::test]
    async fn inactive_records_block_new_stock_flows() {
        let fx = Fixture::new().await;
        let product = fx.product(3).await;

        fx.services
            .flags
            .set_active::<Suppliers>(fx.supplier, false)
            .await
            .unwrap();
        let err = fx.deliver(product, 1).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::InvalidArgument(_))));

        fx.services
            .flags
            .set_active::<Clients>(fx.client, false)
            .await
            .unwrap();
        let err = fx
            .services
            .sales
            .create(fx.sale(vec![SaleLine::new(product, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::InvalidArgument(_))));

        fx.services.flags.set_active::<Clients>(fx.client, true).await.unwrap();
        let deactivated = fx
            .services
            .flags
            .set_active::<Products>(product, false)
            .await
            .unwrap();
        assert!(!deactivated.is_active);
        let err = fx
            .services
            .sales
            .create(fx.sale(vec![SaleLine::new(product, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::InvalidArgument(_))));
        assert_eq!(fx.stock(product).await, 3);

        let err = fx
            .services
            .flags
            .set_active::<Products>(ProductId::new(), true)
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn cancelling_a_sale_of_a_deactivated_product_still_restores_stock() {
        let fx = Fixture::new().await;
        let product = fx.product(2).await;
        let sale = fx
            .services
            .sales
            .create(fx.sale(vec![SaleLine::new(product, 2)]))
            .await
            .unwrap();
        fx.services
            .flags
            .set_active::<Products>(product, false)
            .await
            .unwrap();

        fx.services.sales.cancel(sale.id, fx.user).await.unwrap();
        assert_eq!(fx.stock(product).await, 2);
    }

    #[tokio::test]
    async fn stock_alerts_follow_thresholds() {
        let fx = Fixture::new().await;
        let low = fx.product_with_thresholds(1, 5, Some(20)).await;
        let high = fx.product_with_thresholds(30, 5, Some(20)).await;
        let normal = fx.product_with_thresholds(10, 5, Some(20)).await;

        let alerts = fx.services.alerts.stock_alerts().await.unwrap();
        assert_eq!(alerts.low.iter().map(|p| p.id).collect::<Vec<_>>(), vec![low]);
        assert_eq!(alerts.high.iter().map(|p| p.id).collect::<Vec<_>>(), vec![high]);

        let report = fx.services.alerts.reconcile(normal).await.unwrap();
        assert!(report.consistent);
        assert_eq!(report.ledger_net, 10);

        let err = fx.services.alerts.reconcile(ProductId::new()).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn sale_movements_of_unknown_sale_are_not_found() {
        let fx = Fixture::new().await;
        let err = fx.services.movements.for_sale(SaleId::new()).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::NotFound { .. })));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Deliver(i64),
        Sell(i64),
        CancelLast,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1i64..20).prop_map(Op::Deliver),
            (1i64..20).prop_map(Op::Sell),
            Just(Op::CancelLast),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn stock_always_equals_ledger_net(ops in proptest::collection::vec(op(), 1..25)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let fx = Fixture::new().await;
                let product = fx.product(0).await;
                let mut expected = 0i64;
                let mut sales = Vec::new();

                for op in ops {
                    match op {
                        Op::Deliver(n) => {
                            fx.deliver(product, n).await.unwrap();
                            expected += n;
                        }
                        Op::Sell(n) => {
                            let outcome = fx
                                .services
                                .sales
                                .create(fx.sale(vec![SaleLine::new(product, n)]))
                                .await;
                            match outcome {
                                Ok(sale) => {
                                    expected -= n;
                                    sales.push((sale.id, n));
                                }
                                Err(_) => assert!(n > expected),
                            }
                        }
                        Op::CancelLast => {
                            if let Some((id, n)) = sales.pop() {
                                fx.services.sales.cancel(id, fx.user).await.unwrap();
                                expected += n;
                            }
                        }
                    }
                    assert!(expected >= 0);
                    assert_eq!(fx.stock(product).await, expected);
                }
                fx.assert_ledger_consistent().await;
            });
        }
    }
}
