//! Async ledger service
//!
//! Every mutation goes through one task, so check-then-commit sequences such as
//! "not yet submitted, then record submission" never interleave.

use std::sync::Arc;

use log::{debug, info};
use tokio::sync::{mpsc, oneshot};

use super::{Disclosure, Ledger, LedgerError, SubmissionReceipt};
use scribe_fhe::{CiphertextHandle, InputProof};
use scribe_paper::{Paper, PaperId, PaperMetadata, Principal};

type Reply<T> = oneshot::Sender<Result<T, LedgerError>>;

/// Messages for the ledger service
pub enum LedgerCommand {
    Register {
        caller: Principal,
        id: PaperId,
        metadata: PaperMetadata,
        reply: Reply<Paper>,
    },
    Update {
        caller: Principal,
        id: PaperId,
        metadata: PaperMetadata,
        reply: Reply<Paper>,
    },
    Submit {
        reviewer: Principal,
        paper_id: PaperId,
        score: CiphertextHandle,
        proof: InputProof,
        reply: Reply<SubmissionReceipt>,
    },
    PrepareAverage {
        requester: Principal,
        paper_id: PaperId,
        reply: Reply<Disclosure>,
    },
    ShareTotal {
        requester: Principal,
        paper_id: PaperId,
        reply: Reply<Disclosure>,
    },
    TransferOwnership {
        caller: Principal,
        new_owner: Principal,
        reply: Reply<()>,
    },
    RenounceOwnership {
        caller: Principal,
        reply: Reply<()>,
    },
    Shutdown,
}

impl LedgerCommand {
    fn execute(self, ledger: &Ledger) -> bool {
        match self {
            Self::Register {
                caller,
                id,
                metadata,
                reply,
            } => {
                let _ = reply.send(ledger.registry.register(&caller, id, metadata));
            }
            Self::Update {
                caller,
                id,
                metadata,
                reply,
            } => {
                let _ = reply.send(ledger.registry.update(&caller, id, metadata));
            }
            Self::Submit {
                reviewer,
                paper_id,
                score,
                proof,
                reply,
            } => {
                let _ = reply.send(ledger.scores.submit(&reviewer, paper_id, score, &proof));
            }
            Self::PrepareAverage {
                requester,
                paper_id,
                reply,
            } => {
                let _ = reply.send(ledger.disclosure.prepare_average(&requester, paper_id));
            }
            Self::ShareTotal {
                requester,
                paper_id,
                reply,
            } => {
                let _ = reply.send(ledger.disclosure.share_total(&requester, paper_id));
            }
            Self::TransferOwnership {
                caller,
                new_owner,
                reply,
            } => {
                let _ = reply.send(ledger.registry.transfer_ownership(&caller, new_owner));
            }
            Self::RenounceOwnership { caller, reply } => {
                let _ = reply.send(ledger.registry.renounce_ownership(&caller));
            }
            Self::Shutdown => return false,
        }
        true
    }
}

/// Single-writer front for a [`Ledger`]
pub struct LedgerService {
    command_tx: mpsc::Sender<LedgerCommand>,
    ledger: Arc<Ledger>,
}

impl LedgerService {
    /// Spawn the command loop. Must be called inside a tokio runtime.
    pub fn start(ledger: Arc<Ledger>) -> Self {
        let (command_tx, mut command_rx) = mpsc::channel::<LedgerCommand>(1000);

        let worker = ledger.clone();
        tokio::spawn(async move {
            while let Some(cmd) = command_rx.recv().await {
                if !cmd.execute(&worker) {
                    info!("Ledger service shutting down");
                    break;
                }
            }
            debug!("Ledger command loop exited");
        });

        Self { command_tx, ledger }
    }

    /// Direct read access
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    async fn call<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> LedgerCommand,
    ) -> Result<T, LedgerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(build(reply_tx))
            .await
            .map_err(|_| LedgerError::Unavailable("ledger service unavailable".into()))?;
        reply_rx
            .await
            .map_err(|_| LedgerError::Unavailable("ledger service crashed".into()))?
    }

    pub async fn register(
        &self,
        caller: Principal,
        id: PaperId,
        metadata: PaperMetadata,
    ) -> Result<Paper, LedgerError> {
        self.call(|reply| LedgerCommand::Register {
            caller,
            id,
            metadata,
            reply,
        })
        .await
    }

    pub async fn update(
        &self,
        caller: Principal,
        id: PaperId,
        metadata: PaperMetadata,
    ) -> Result<Paper, LedgerError> {
        self.call(|reply| LedgerCommand::Update {
            caller,
            id,
            metadata,
            reply,
        })
        .await
    }

    pub async fn submit(
        &self,
        reviewer: Principal,
        paper_id: PaperId,
        score: CiphertextHandle,
        proof: InputProof,
    ) -> Result<SubmissionReceipt, LedgerError> {
        self.call(|reply| LedgerCommand::Submit {
            reviewer,
            paper_id,
            score,
            proof,
            reply,
        })
        .await
    }

    pub async fn prepare_average(
        &self,
        requester: Principal,
        paper_id: PaperId,
    ) -> Result<Disclosure, LedgerError> {
        self.call(|reply| LedgerCommand::PrepareAverage {
            requester,
            paper_id,
            reply,
        })
        .await
    }

    pub async fn share_total(
        &self,
        requester: Principal,
        paper_id: PaperId,
    ) -> Result<Disclosure, LedgerError> {
        self.call(|reply| LedgerCommand::ShareTotal {
            requester,
            paper_id,
            reply,
        })
        .await
    }

    pub async fn transfer_ownership(
        &self,
        caller: Principal,
        new_owner: Principal,
    ) -> Result<(), LedgerError> {
        self.call(|reply| LedgerCommand::TransferOwnership {
            caller,
            new_owner,
            reply,
        })
        .await
    }

    pub async fn renounce_ownership(&self, caller: Principal) -> Result<(), LedgerError> {
        self.call(|reply| LedgerCommand::RenounceOwnership { caller, reply })
            .await
    }

    /// Stop the command loop. Pending reads keep working.
    pub async fn shutdown(&self) -> Result<(), LedgerError> {
        self.command_tx
            .send(LedgerCommand::Shutdown)
            .await
            .map_err(|_| LedgerError::Unavailable("ledger service unavailable".into()))
    }
}
