//! Wallet ledger schema.
//!
//! Creates the wallet, ledger, withdrawal, reconciliation, unlinked-credit and balance history
//! tables together with the triggers that keep the ledger append-only.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: WALLETS & LEDGER
        // ============================================================
        db.execute_unprepared(WALLETS_SQL).await?;
        db.execute_unprepared(WALLET_TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 2: WORKFLOWS
        // ============================================================
        db.execute_unprepared(WITHDRAWAL_REQUESTS_SQL).await?;
        db.execute_unprepared(UNLINKED_CREDITS_SQL).await?;
        db.execute_unprepared(COD_RECONCILIATIONS_SQL).await?;

        // ============================================================
        // PART 3: REPORTING
        // ============================================================
        db.execute_unprepared(SHIPPER_BALANCE_HISTORY_SQL).await?;

        // ============================================================
        // PART 4: TRIGGERS & FUNCTIONS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const WALLETS_SQL: &str = r"
CREATE TABLE wallets (
    id UUID PRIMARY KEY,
    owner_id UUID NOT NULL UNIQUE,
    bank_name VARCHAR(255) NOT NULL,
    bank_account_number VARCHAR(64) NOT NULL,
    bank_account_name VARCHAR(255) NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    balance BIGINT NOT NULL DEFAULT 0,
    pending_amount BIGINT NOT NULL DEFAULT 0,
    total_earned BIGINT NOT NULL DEFAULT 0,
    total_withdrawn BIGINT NOT NULL DEFAULT 0,
    version BIGINT NOT NULL DEFAULT 0,
    last_sequence BIGINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_bank_info_present CHECK (
        btrim(bank_name) <> '' AND btrim(bank_account_number) <> '' AND btrim(bank_account_name) <> ''
    ),
    CONSTRAINT chk_wallet_non_negative CHECK (
        balance >= 0 AND pending_amount >= 0 AND total_earned >= 0 AND total_withdrawn >= 0
    ),
    CONSTRAINT chk_wallet_invariant CHECK (
        balance + pending_amount + total_withdrawn = total_earned
    ),
    CONSTRAINT chk_wallet_counters CHECK (version >= 0 AND last_sequence >= 0)
);
";

const WALLET_TRANSACTIONS_SQL: &str = r"
CREATE TABLE wallet_transactions (
    id UUID PRIMARY KEY,
    wallet_id UUID NOT NULL REFERENCES wallets(id),
    sequence BIGINT NOT NULL,
    transaction_type VARCHAR(20) NOT NULL,
    amount BIGINT NOT NULL,
    balance_before BIGINT NOT NULL,
    balance_after BIGINT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    reference_code VARCHAR(128) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_wtx_type CHECK (
        transaction_type IN ('ORDER_PAYMENT', 'WITHDRAWAL', 'REFUND', 'ADJUSTMENT')
    ),
    CONSTRAINT chk_wtx_sequence CHECK (sequence > 0),
    CONSTRAINT chk_wtx_amount_non_zero CHECK (amount <> 0),
    CONSTRAINT chk_wtx_withdrawal_is_debit CHECK (
        (transaction_type = 'WITHDRAWAL' AND amount < 0)
        OR (transaction_type <> 'WITHDRAWAL' AND amount > 0)
    ),
    CONSTRAINT chk_wtx_arithmetic CHECK (
        balance_before >= 0 AND balance_after >= 0 AND balance_after = balance_before + amount
    ),
    CONSTRAINT uq_wtx_sequence UNIQUE (wallet_id, sequence),
    CONSTRAINT uq_wtx_reference UNIQUE (wallet_id, transaction_type, reference_code)
);

CREATE INDEX idx_wtx_wallet_created ON wallet_transactions(wallet_id, created_at);
";

const WITHDRAWAL_REQUESTS_SQL: &str = r"
CREATE TABLE withdrawal_requests (
    id UUID PRIMARY KEY,
    wallet_id UUID NOT NULL REFERENCES wallets(id),
    owner_id UUID NOT NULL,
    amount BIGINT NOT NULL,
    bank_name VARCHAR(255) NOT NULL,
    bank_account_number VARCHAR(64) NOT NULL,
    bank_account_name VARCHAR(255) NOT NULL,
    note TEXT,
    admin_note TEXT,
    status VARCHAR(20) NOT NULL DEFAULT 'PENDING',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    processed_at TIMESTAMPTZ,
    CONSTRAINT chk_wdr_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_wdr_status CHECK (status IN ('PENDING', 'APPROVED', 'REJECTED', 'COMPLETED')),
    CONSTRAINT chk_wdr_processed CHECK (status = 'PENDING' OR processed_at IS NOT NULL)
);

CREATE INDEX idx_wdr_wallet_created ON withdrawal_requests(wallet_id, created_at);
CREATE INDEX idx_wdr_status_created ON withdrawal_requests(status, created_at);
";

const UNLINKED_CREDITS_SQL: &str = r"
CREATE TABLE unlinked_credits (
    id UUID PRIMARY KEY,
    owner_id UUID NOT NULL,
    transaction_type VARCHAR(20) NOT NULL,
    amount BIGINT NOT NULL,
    reference_code VARCHAR(128) NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    source VARCHAR(20) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    linked_at TIMESTAMPTZ,
    linked_transaction_id UUID REFERENCES wallet_transactions(id),
    CONSTRAINT chk_unlinked_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_unlinked_type CHECK (transaction_type IN ('ORDER_PAYMENT', 'REFUND', 'ADJUSTMENT')),
    CONSTRAINT chk_unlinked_source CHECK (source IN ('ORDER_PAYMENT', 'RECONCILIATION')),
    CONSTRAINT chk_unlinked_link CHECK ((linked_at IS NULL) = (linked_transaction_id IS NULL)),
    CONSTRAINT uq_unlinked_reference UNIQUE (owner_id, transaction_type, reference_code)
);

CREATE INDEX idx_unlinked_owner_created ON unlinked_credits(owner_id, created_at);
";

const COD_RECONCILIATIONS_SQL: &str = r"
CREATE TABLE cod_reconciliations (
    id UUID PRIMARY KEY,
    shipper_id UUID NOT NULL,
    date DATE NOT NULL,
    status VARCHAR(20) NOT NULL DEFAULT 'PENDING',
    corrects UUID REFERENCES cod_reconciliations(id),
    total_collected BIGINT NOT NULL,
    total_deposited BIGINT NOT NULL,
    difference BIGINT NOT NULL,
    settlement_transaction_id UUID REFERENCES wallet_transactions(id),
    unlinked_credit_id UUID REFERENCES unlinked_credits(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    completed_at TIMESTAMPTZ,
    version BIGINT NOT NULL DEFAULT 1,
    CONSTRAINT chk_cod_status CHECK (status IN ('PENDING', 'PROCESSING', 'DONE')),
    CONSTRAINT chk_cod_totals CHECK (total_collected >= 0 AND total_deposited >= 0),
    CONSTRAINT chk_cod_difference CHECK (difference = total_deposited - total_collected),
    CONSTRAINT chk_cod_completed CHECK ((status = 'DONE') = (completed_at IS NOT NULL)),
    CONSTRAINT chk_cod_single_settlement CHECK (
        settlement_transaction_id IS NULL OR unlinked_credit_id IS NULL
    ),
    CONSTRAINT chk_cod_version CHECK (version >= 1),
    CONSTRAINT chk_cod_not_self_correction CHECK (corrects IS NULL OR corrects <> id)
);

-- One original row per shipper and day; corrections chain off settled rows, one each
CREATE UNIQUE INDEX uq_cod_shipper_date ON cod_reconciliations(shipper_id, date)
    WHERE corrects IS NULL;
CREATE UNIQUE INDEX uq_cod_correction ON cod_reconciliations(corrects)
    WHERE corrects IS NOT NULL;

CREATE INDEX idx_cod_date ON cod_reconciliations(date);
";

const SHIPPER_BALANCE_HISTORY_SQL: &str = r"
CREATE TABLE shipper_balance_history (
    id UUID PRIMARY KEY,
    shipper_id UUID NOT NULL,
    date DATE NOT NULL,
    opening_balance BIGINT NOT NULL,
    collected BIGINT NOT NULL,
    deposited BIGINT NOT NULL,
    bonus BIGINT NOT NULL,
    final_balance BIGINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_sbh_figures CHECK (collected >= 0 AND deposited >= 0 AND bonus >= 0),
    CONSTRAINT chk_sbh_arithmetic CHECK (
        final_balance = opening_balance + collected - deposited + bonus
    ),
    CONSTRAINT uq_sbh_shipper_date UNIQUE (shipper_id, date)
);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_ledger_modification
-- Committed ledger and history rows are never changed or removed
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_ledger_modification()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION '% is append-only. Write a compensating entry instead.', TG_TABLE_NAME;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_wallet_transactions_append_only
BEFORE UPDATE OR DELETE ON wallet_transactions
FOR EACH ROW
EXECUTE FUNCTION prevent_ledger_modification();

-- ============================================================
-- FUNCTION: prevent_settled_reconciliation_modification
-- DONE reconciliations are frozen
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_settled_reconciliation_modification()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.status = 'DONE' THEN
        RAISE EXCEPTION 'Cannot modify settled reconciliation %', OLD.id;
    END IF;
    IF TG_OP = 'DELETE' THEN
        RETURN OLD;
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_settled_reconciliation_mod
BEFORE UPDATE OR DELETE ON cod_reconciliations
FOR EACH ROW
EXECUTE FUNCTION prevent_settled_reconciliation_modification();

-- ============================================================
-- FUNCTION: check_reconciliation_correction
-- A correction points at a DONE row of the same shipper and day
-- ============================================================
CREATE OR REPLACE FUNCTION check_reconciliation_correction()
RETURNS TRIGGER AS $$
DECLARE
    v_target RECORD;
BEGIN
    IF NEW.corrects IS NULL THEN
        RETURN NEW;
    END IF;

    SELECT status, shipper_id, date INTO v_target
    FROM cod_reconciliations WHERE id = NEW.corrects;

    IF v_target.status IS DISTINCT FROM 'DONE' THEN
        RAISE EXCEPTION 'Reconciliation % has not settled and cannot be corrected', NEW.corrects;
    END IF;
    IF v_target.shipper_id <> NEW.shipper_id OR v_target.date <> NEW.date THEN
        RAISE EXCEPTION 'Correction % must keep the shipper and day of %', NEW.id, NEW.corrects;
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_check_reconciliation_correction
BEFORE INSERT ON cod_reconciliations
FOR EACH ROW
EXECUTE FUNCTION check_reconciliation_correction();

-- Balance history rows chain on each other and are never rewritten
CREATE TRIGGER trg_shipper_balance_history_append_only
BEFORE UPDATE OR DELETE ON shipper_balance_history
FOR EACH ROW
EXECUTE FUNCTION prevent_ledger_modification();
";

const DROP_ALL_SQL: &str = r"
-- ============================================================
-- DROP ALL: Rollback migration
-- ============================================================
DROP TRIGGER IF EXISTS trg_shipper_balance_history_append_only ON shipper_balance_history;
DROP TRIGGER IF EXISTS trg_check_reconciliation_correction ON cod_reconciliations;
DROP TRIGGER IF EXISTS trg_prevent_settled_reconciliation_mod ON cod_reconciliations;
DROP TRIGGER IF EXISTS trg_wallet_transactions_append_only ON wallet_transactions;

DROP FUNCTION IF EXISTS check_reconciliation_correction();
DROP FUNCTION IF EXISTS prevent_settled_reconciliation_modification();
DROP FUNCTION IF EXISTS prevent_ledger_modification();

DROP TABLE IF EXISTS shipper_balance_history CASCADE;
DROP TABLE IF EXISTS cod_reconciliations CASCADE;
DROP TABLE IF EXISTS unlinked_credits CASCADE;
DROP TABLE IF EXISTS withdrawal_requests CASCADE;
DROP TABLE IF EXISTS wallet_transactions CASCADE;
DROP TABLE IF EXISTS wallets CASCADE;
";
