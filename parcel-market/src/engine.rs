use crate::lease::{LeaseBid, LeaseOffer, OfferId};
use crate::listing::{BidState, ListingStatus};
use crate::revenue::{RevenueRound, RoundId, RoundStatus};
use crate::sale::{Sale, SaleBid, SaleId};
use log::{debug, info};
use parcel_agreement::{AgreementAuthority, LeaseCertificate, LeaseTerms, SignatureScheme, TermsSignature};
use parcel_core::{MarketError, ParcelId, PaymentAsset};
use parcel_ledger::OwnershipLedger;
use std::collections::HashMap;

/// Marketplace settlement engine
///
/// A single, globally-ordered state machine: every operation executes one
/// at a time in the order the surrounding environment submits it, and
/// every time-sensitive operation takes `now` explicitly rather than
/// reading a clock. Sales, lease offers and revenue rounds live in arena
/// collections addressed by opaque integer ids; all cross-references are
/// by id.
///
/// Each state-mutating operation validates completely before touching
/// anything, so any error leaves ledgers, escrows, bids, offers and
/// rounds exactly as they were. Resolution flags (Won, Refunded,
/// Accepted, claimed) are always set before the corresponding payment
/// call, which closes the re-entrant double-release hazard.
pub struct MarketplaceEngine<P: PaymentAsset, S: SignatureScheme> {
    /// The engine's own identity; escrowed funds sit on this account
    engine_id: ParcelId,

    /// Role allowed to feed external revenue into rounds and close them
    operator: ParcelId,

    payment: P,
    authority: AgreementAuthority<S>,
    ledgers: HashMap<ParcelId, OwnershipLedger>,
    certificates: HashMap<ParcelId, LeaseCertificate>,
    sales: Vec<Sale>,
    offers: Vec<LeaseOffer>,
    rounds: Vec<RevenueRound>,
}

impl<P: PaymentAsset, S: SignatureScheme> MarketplaceEngine<P, S> {
    pub fn new(engine_id: ParcelId, operator: ParcelId, payment: P, scheme: S) -> Self {
        Self {
            engine_id,
            operator,
            payment,
            authority: AgreementAuthority::new(scheme),
            ledgers: HashMap::new(),
            certificates: HashMap::new(),
            sales: Vec::new(),
            offers: Vec::new(),
            rounds: Vec::new(),
        }
    }

    pub fn engine_id(&self) -> &ParcelId {
        &self.engine_id
    }

    pub fn payment(&self) -> &P {
        &self.payment
    }

    pub fn payment_mut(&mut self) -> &mut P {
        &mut self.payment
    }

    // ---- Asset registry surface ----

    /// Initialize the ownership ledger for a newly registered asset
    ///
    /// The (asset id, initial holder, total supply) triple comes from the
    /// asset registry collaborator; each asset is registered exactly once.
    pub fn register_asset(
        &mut self,
        asset_id: ParcelId,
        initial_holder: ParcelId,
        total_supply: u128,
    ) -> Result<(), MarketError> {
        if self.ledgers.contains_key(&asset_id) {
            return Err(MarketError::DuplicateAsset(asset_id));
        }
        let ledger = OwnershipLedger::new(asset_id, initial_holder, total_supply)?;
        self.ledgers.insert(asset_id, ledger);
        info!(
            "registered asset {} with supply {} held by {}",
            asset_id, total_supply, initial_holder
        );
        Ok(())
    }

    pub fn ledger(&self, asset_id: &ParcelId) -> Result<&OwnershipLedger, MarketError> {
        self.ledgers
            .get(asset_id)
            .ok_or(MarketError::UnknownAsset(*asset_id))
    }

    /// Transfer ownership units on behalf of their holder
    pub fn transfer_units(
        &mut self,
        asset_id: &ParcelId,
        caller: &ParcelId,
        to: &ParcelId,
        amount: u128,
    ) -> Result<(), MarketError> {
        let ledger = self
            .ledgers
            .get_mut(asset_id)
            .ok_or(MarketError::UnknownAsset(*asset_id))?;
        ledger.transfer(caller, to, amount)
    }

    /// Pre-authorize `spender` (typically the engine itself) to move the
    /// caller's ownership units at settlement time
    pub fn approve_units(
        &mut self,
        asset_id: &ParcelId,
        caller: &ParcelId,
        spender: &ParcelId,
        amount: u128,
    ) -> Result<(), MarketError> {
        let ledger = self
            .ledgers
            .get_mut(asset_id)
            .ok_or(MarketError::UnknownAsset(*asset_id))?;
        ledger.approve(caller, spender, amount);
        Ok(())
    }

    // ---- Sale flow ----

    pub fn sale(&self, sale_id: SaleId) -> Option<&Sale> {
        self.sales.get(sale_id as usize)
    }

    /// List `amount` ownership units of `asset_id` for sale
    pub fn post_sale(
        &mut self,
        caller: &ParcelId,
        asset_id: ParcelId,
        amount: u128,
        ask_price: u128,
    ) -> Result<SaleId, MarketError> {
        if !self.ledgers.contains_key(&asset_id) {
            return Err(MarketError::UnknownAsset(asset_id));
        }
        if amount == 0 {
            return Err(MarketError::Other("sale amount must be positive".to_string()));
        }

        let sale_id = self.sales.len() as SaleId;
        self.sales.push(Sale::new(*caller, asset_id, amount, ask_price));
        info!(
            "sale {}: {} lists {} units of {} asking {}",
            sale_id, caller, amount, asset_id, ask_price
        );
        Ok(sale_id)
    }

    /// Bid on an open sale, escrowing the offered price immediately
    ///
    /// Bids cover the full listed lot; the escrow is held by the engine
    /// until the bid is won or refunded.
    pub fn place_sale_bid(
        &mut self,
        sale_id: SaleId,
        caller: &ParcelId,
        amount: u128,
        price: u128,
    ) -> Result<usize, MarketError> {
        let engine_id = self.engine_id;
        let sale = self
            .sales
            .get(sale_id as usize)
            .ok_or(MarketError::InvalidIndex(sale_id as usize))?;
        if !sale.status.is_open() {
            return Err(MarketError::AlreadyClosed);
        }
        if amount != sale.amount {
            return Err(MarketError::Other(
                "bid must cover the full listed amount".to_string(),
            ));
        }
        if caller.is_zero() {
            return Err(MarketError::ZeroAddress);
        }

        let available = self.payment.balance_of(caller);
        if available < price {
            return Err(MarketError::InsufficientEscrow {
                needed: price,
                available,
            });
        }
        self.payment.transfer_from(&engine_id, caller, &engine_id, price)?;

        let sale = &mut self.sales[sale_id as usize];
        sale.bids.push(SaleBid {
            bidder: *caller,
            amount,
            price,
            escrow: price,
            state: BidState::Active,
        });
        let index = sale.bids.len() - 1;
        debug!(
            "sale {}: bid {} from {} escrowed {}",
            sale_id, index, caller, price
        );
        Ok(index)
    }

    /// Accept one bid, settle the trade and refund every other bid
    ///
    /// Seller-only. Transfers the listed units to the winning bidder using
    /// the seller's pre-authorized allowance, releases the winning escrow
    /// to the seller, and refunds all other active bids in the same
    /// atomic step.
    pub fn accept_sale_bid(
        &mut self,
        sale_id: SaleId,
        index: usize,
        caller: &ParcelId,
    ) -> Result<(), MarketError> {
        let engine_id = self.engine_id;
        let sale = self
            .sales
            .get(sale_id as usize)
            .ok_or(MarketError::InvalidIndex(sale_id as usize))?;
        if sale.seller != *caller {
            return Err(MarketError::Unauthorized(*caller));
        }
        if !sale.status.is_open() {
            return Err(MarketError::AlreadyClosed);
        }
        let bid = sale.bids.get(index).ok_or(MarketError::InvalidIndex(index))?;
        if !bid.state.is_active() {
            return Err(MarketError::InvalidIndex(index));
        }
        let (asset_id, amount, seller, winner, price) =
            (sale.asset_id, sale.amount, sale.seller, bid.bidder, bid.price);

        // The seller must have pre-authorized the unit transfer and still
        // hold the listed lot.
        let ledger = self
            .ledgers
            .get(&asset_id)
            .ok_or(MarketError::UnknownAsset(asset_id))?;
        let approved = ledger.allowance(&seller, &engine_id);
        if approved < amount {
            return Err(MarketError::InsufficientApproval {
                needed: amount,
                approved,
            });
        }
        let available = ledger.balance_of(&seller);
        if available < amount {
            return Err(MarketError::InsufficientBalance {
                needed: amount,
                available,
            });
        }

        // All checks passed. Resolve listing and bid state before any
        // payment call.
        let mut refunds = Vec::new();
        {
            let sale = &mut self.sales[sale_id as usize];
            sale.status = ListingStatus::Accepted;
            for (i, bid) in sale.bids.iter_mut().enumerate() {
                if i == index {
                    bid.state = BidState::Won;
                } else if bid.state.is_active() {
                    bid.state = BidState::Refunded;
                    refunds.push((bid.bidder, bid.escrow));
                }
            }
        }

        let ledger = self
            .ledgers
            .get_mut(&asset_id)
            .ok_or(MarketError::UnknownAsset(asset_id))?;
        ledger.transfer_from(&engine_id, &seller, &winner, amount)?;
        self.payment.transfer(&engine_id, &seller, price)?;
        for (bidder, escrow) in &refunds {
            self.payment.transfer(&engine_id, bidder, *escrow)?;
        }

        info!(
            "sale {}: accepted bid {} from {} for {}; {} bids refunded",
            sale_id,
            index,
            winner,
            price,
            refunds.len()
        );
        Ok(())
    }

    /// Withdraw an open sale and refund all active bids. Creator-only;
    /// impossible once a bid has been accepted.
    pub fn cancel_sale(&mut self, sale_id: SaleId, caller: &ParcelId) -> Result<(), MarketError> {
        let engine_id = self.engine_id;
        let sale = self
            .sales
            .get(sale_id as usize)
            .ok_or(MarketError::InvalidIndex(sale_id as usize))?;
        if sale.seller != *caller {
            return Err(MarketError::Unauthorized(*caller));
        }
        if !sale.status.is_open() {
            return Err(MarketError::AlreadyClosed);
        }

        let mut refunds = Vec::new();
        {
            let sale = &mut self.sales[sale_id as usize];
            sale.status = ListingStatus::Cancelled;
            for bid in sale.bids.iter_mut() {
                if bid.state.is_active() {
                    bid.state = BidState::Refunded;
                    refunds.push((bid.bidder, bid.escrow));
                }
            }
        }
        for (bidder, escrow) in refunds {
            self.payment.transfer(&engine_id, &bidder, escrow)?;
        }
        info!("sale {}: cancelled by {}", sale_id, caller);
        Ok(())
    }

    // ---- Lease flow ----

    pub fn lease_offer(&self, offer_id: OfferId) -> Option<&LeaseOffer> {
        self.offers.get(offer_id as usize)
    }

    pub fn certificate(&self, id: &ParcelId) -> Option<&LeaseCertificate> {
        self.certificates.get(id)
    }

    /// Post a lease offer with the lessee slot left open
    pub fn post_lease_offer(
        &mut self,
        caller: &ParcelId,
        terms: LeaseTerms,
        deadline: u64,
    ) -> Result<OfferId, MarketError> {
        if terms.lessor != *caller {
            return Err(MarketError::Unauthorized(*caller));
        }
        if !terms.is_skeleton() {
            return Err(MarketError::Other(
                "lease offer terms must leave the lessee open".to_string(),
            ));
        }
        if !self.ledgers.contains_key(&terms.asset_id) {
            return Err(MarketError::UnknownAsset(terms.asset_id));
        }

        let offer_id = self.offers.len() as OfferId;
        let asset_id = terms.asset_id;
        self.offers.push(LeaseOffer::new(*caller, terms, deadline));
        info!(
            "lease offer {}: {} offers asset {} until {}",
            offer_id, caller, asset_id, deadline
        );
        Ok(offer_id)
    }

    /// Bid on an open lease offer as candidate lessee
    ///
    /// Escrows `funds` and records the bidder's structured-data signature
    /// over the offer terms with themselves filled in as lessee.
    pub fn place_lease_bid(
        &mut self,
        offer_id: OfferId,
        caller: &ParcelId,
        signature: TermsSignature,
        funds: u128,
        now: u64,
    ) -> Result<usize, MarketError> {
        let engine_id = self.engine_id;
        let offer = self
            .offers
            .get(offer_id as usize)
            .ok_or(MarketError::InvalidIndex(offer_id as usize))?;
        if !offer.status.is_open() {
            return Err(MarketError::AlreadyClosed);
        }
        if now > offer.deadline {
            return Err(MarketError::ExpiredAuthorization {
                deadline: offer.deadline,
                now,
            });
        }
        if caller.is_zero() {
            return Err(MarketError::ZeroAddress);
        }

        let available = self.payment.balance_of(caller);
        if available < funds {
            return Err(MarketError::InsufficientEscrow {
                needed: funds,
                available,
            });
        }
        self.payment.transfer_from(&engine_id, caller, &engine_id, funds)?;

        let offer = &mut self.offers[offer_id as usize];
        offer.bids.push(LeaseBid {
            bidder: *caller,
            escrow: funds,
            signature,
            state: BidState::Active,
        });
        let index = offer.bids.len() - 1;
        debug!(
            "lease offer {}: bid {} from {} escrowed {}",
            offer_id, index, caller, funds
        );
        Ok(index)
    }

    /// Accept one lease bid: verify the dual signatures, issue the
    /// certificate, open a revenue round and refund every other bid
    ///
    /// Lessor-only. The lessor supplies their signature over the offer
    /// terms completed with the winning bidder as lessee; verification
    /// failure leaves the offer open, the bid active and all escrows
    /// untouched. On success the engine takes a ledger checkpoint
    /// atomically with round opening, retains the accepted escrow as the
    /// round's distributable pool, and refunds all other active bids.
    ///
    /// Returns the certificate id and the opened round id.
    pub fn accept_lease_bid(
        &mut self,
        offer_id: OfferId,
        index: usize,
        caller: &ParcelId,
        lessor_signature: &TermsSignature,
        now: u64,
    ) -> Result<(ParcelId, RoundId), MarketError> {
        let engine_id = self.engine_id;
        let offer = self
            .offers
            .get(offer_id as usize)
            .ok_or(MarketError::InvalidIndex(offer_id as usize))?;
        if offer.lessor != *caller {
            return Err(MarketError::Unauthorized(*caller));
        }
        if !offer.status.is_open() {
            return Err(MarketError::AlreadyClosed);
        }
        let bid = offer.bids.get(index).ok_or(MarketError::InvalidIndex(index))?;
        if !bid.state.is_active() {
            return Err(MarketError::InvalidIndex(index));
        }

        let asset_id = offer.terms.asset_id;
        if !self.ledgers.contains_key(&asset_id) {
            return Err(MarketError::UnknownAsset(asset_id));
        }

        let completed = offer.terms.with_lessee(bid.bidder);
        let deadline = offer.deadline;
        let winner = bid.bidder;
        let escrow = bid.escrow;
        let lessee_signature = bid.signature.clone();

        // Both parties must have signed the identical completed terms;
        // failure here leaves everything as it was.
        let certificate = self.authority.verify_and_issue(
            completed,
            lessor_signature,
            &lessee_signature,
            deadline,
            now,
        )?;

        // Signatures verified. Resolve offer and bid state before any
        // payment call.
        let mut refunds = Vec::new();
        {
            let offer = &mut self.offers[offer_id as usize];
            offer.status = ListingStatus::Accepted;
            for (i, bid) in offer.bids.iter_mut().enumerate() {
                if i == index {
                    bid.state = BidState::Won;
                } else if bid.state.is_active() {
                    bid.state = BidState::Refunded;
                    refunds.push((bid.bidder, bid.escrow));
                }
            }
        }

        // Checkpoint atomically with round opening so the holder set is
        // pinned at acceptance, not on a delay.
        let ledger = self
            .ledgers
            .get_mut(&asset_id)
            .ok_or(MarketError::UnknownAsset(asset_id))?;
        let checkpoint_sequence = ledger.take_checkpoint();
        let supply = ledger.total_supply_at(checkpoint_sequence);

        let round_id = self.rounds.len() as RoundId;
        self.rounds
            .push(RevenueRound::new(asset_id, checkpoint_sequence, escrow, supply));

        let certificate_id = certificate.id;
        self.certificates.insert(certificate_id, certificate);

        // The accepted escrow stays in engine custody as the round pool;
        // every other escrow goes straight back to its bidder.
        for (bidder, amount) in &refunds {
            self.payment.transfer(&engine_id, bidder, *amount)?;
        }

        info!(
            "lease offer {}: accepted bid {} from {}; certificate {}, round {} over {} at sequence {}",
            offer_id, index, winner, certificate_id, round_id, escrow, checkpoint_sequence
        );
        Ok((certificate_id, round_id))
    }

    /// Withdraw an open lease offer and refund all active bids.
    /// Creator-only; impossible once a bid has been accepted.
    pub fn cancel_lease_offer(
        &mut self,
        offer_id: OfferId,
        caller: &ParcelId,
    ) -> Result<(), MarketError> {
        let engine_id = self.engine_id;
        let offer = self
            .offers
            .get(offer_id as usize)
            .ok_or(MarketError::InvalidIndex(offer_id as usize))?;
        if offer.lessor != *caller {
            return Err(MarketError::Unauthorized(*caller));
        }
        if !offer.status.is_open() {
            return Err(MarketError::AlreadyClosed);
        }

        let mut refunds = Vec::new();
        {
            let offer = &mut self.offers[offer_id as usize];
            offer.status = ListingStatus::Cancelled;
            for bid in offer.bids.iter_mut() {
                if bid.state.is_active() {
                    bid.state = BidState::Refunded;
                    refunds.push((bid.bidder, bid.escrow));
                }
            }
        }
        for (bidder, escrow) in refunds {
            self.payment.transfer(&engine_id, &bidder, escrow)?;
        }
        info!("lease offer {}: cancelled by {}", offer_id, caller);
        Ok(())
    }

    /// Transfer a lease certificate to a new holder. Holder-only.
    pub fn transfer_certificate(
        &mut self,
        certificate_id: &ParcelId,
        caller: &ParcelId,
        to: &ParcelId,
    ) -> Result<(), MarketError> {
        let certificate = self
            .certificates
            .get_mut(certificate_id)
            .ok_or(MarketError::UnknownCertificate(*certificate_id))?;
        certificate.transfer(caller, to)
    }

    // ---- Revenue rounds ----

    pub fn round(&self, round_id: RoundId) -> Option<&RevenueRound> {
        self.rounds.get(round_id as usize)
    }

    /// Claim the caller's pro-rata share of a revenue round
    ///
    /// Eligibility derives purely from the round's checkpointed balance,
    /// never from the caller's present-day holdings: a holder who sold
    /// after the round opened can still claim, and one who bought after
    /// the checkpoint gets nothing. At most one claim per holder per
    /// round.
    pub fn claim_revenue(&mut self, round_id: RoundId, caller: &ParcelId) -> Result<u128, MarketError> {
        let engine_id = self.engine_id;
        let round = self
            .rounds
            .get_mut(round_id as usize)
            .ok_or(MarketError::InvalidIndex(round_id as usize))?;
        if round.status != RoundStatus::Open {
            return Err(MarketError::AlreadyClosed);
        }
        if round.claimed.contains(caller) {
            return Err(MarketError::AlreadyClaimed(*caller));
        }

        let ledger = self
            .ledgers
            .get(&round.asset_id)
            .ok_or(MarketError::UnknownAsset(round.asset_id))?;
        let checkpointed = ledger.balance_at(caller, round.checkpoint_sequence);
        let share = round.share_of(checkpointed)?;
        if share == 0 {
            return Err(MarketError::NothingToClaim);
        }

        // Mark claimed before the payout call.
        round.claimed.insert(*caller);
        self.payment.transfer(&engine_id, caller, share)?;

        debug!(
            "round {}: {} claimed {} for checkpointed balance {}",
            round_id, caller, share, checkpointed
        );
        Ok(share)
    }

    /// Feed externally collected revenue into an open round
    ///
    /// Operator-only hook for the streaming micropayment layer: escrows
    /// `amount` from the operator and raises the round's distributable
    /// total without re-deriving the checkpoint.
    pub fn extend_revenue_round(
        &mut self,
        round_id: RoundId,
        caller: &ParcelId,
        amount: u128,
    ) -> Result<(), MarketError> {
        let engine_id = self.engine_id;
        if *caller != self.operator {
            return Err(MarketError::Unauthorized(*caller));
        }
        let round = self
            .rounds
            .get(round_id as usize)
            .ok_or(MarketError::InvalidIndex(round_id as usize))?;
        if round.status != RoundStatus::Open {
            return Err(MarketError::AlreadyClosed);
        }

        let new_total = round
            .total_amount
            .checked_add(amount)
            .ok_or_else(|| MarketError::Other("round total overflow".to_string()))?;

        let available = self.payment.balance_of(caller);
        if available < amount {
            return Err(MarketError::InsufficientEscrow {
                needed: amount,
                available,
            });
        }
        self.payment.transfer_from(&engine_id, caller, &engine_id, amount)?;

        let round = &mut self.rounds[round_id as usize];
        round.total_amount = new_total;
        info!(
            "round {}: extended by {} to {}",
            round_id, amount, round.total_amount
        );
        Ok(())
    }

    /// Terminally close a round. Operator-only; unclaimed shares and dust
    /// remain in engine custody.
    pub fn close_revenue_round(
        &mut self,
        round_id: RoundId,
        caller: &ParcelId,
    ) -> Result<(), MarketError> {
        if *caller != self.operator {
            return Err(MarketError::Unauthorized(*caller));
        }
        let round = self
            .rounds
            .get_mut(round_id as usize)
            .ok_or(MarketError::InvalidIndex(round_id as usize))?;
        if round.status != RoundStatus::Open {
            return Err(MarketError::AlreadyClosed);
        }
        round.status = RoundStatus::Closed;
        info!("round {}: closed", round_id);
        Ok(())
    }
}
