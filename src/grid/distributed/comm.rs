// ============================================
// Communicator - Обмен байтами между рангами
// ============================================
//
// Коллективная операция all_to_all: каждый ранг отправляет по буферу
// каждому рангу (включая себя) и получает по буферу от каждого.
// Если один из рангов не вызывает операцию, остальные ждут вечно.

use std::sync::mpsc::{channel, Receiver, Sender};

use crate::error::{GridError, GridResult};

pub trait Communicator {
    fn rank(&self) -> usize;
    fn world_size(&self) -> usize;

    /// `outgoing[r]` уходит рангу r; результат `[r]` пришёл от ранга r
    fn all_to_all(&mut self, outgoing: Vec<Vec<u8>>) -> GridResult<Vec<Vec<u8>>>;
}

/// Группа из одного процесса
#[derive(Debug, Default, Clone, Copy)]
pub struct SoloCommunicator;

impl Communicator for SoloCommunicator {
    fn rank(&self) -> usize {
        0
    }

    fn world_size(&self) -> usize {
        1
    }

    fn all_to_all(&mut self, outgoing: Vec<Vec<u8>>) -> GridResult<Vec<Vec<u8>>> {
        assert_eq!(outgoing.len(), 1, "solo all_to_all expects exactly one buffer");
        Ok(outgoing)
    }
}

/// Сообщение между потоками-рангами
struct Envelope {
    source: usize,
    round: u64,
    payload: Vec<u8>,
}

/// Ранги внутри одного процесса: по потоку на ранг, каналы mpsc
pub struct LocalCluster;

impl LocalCluster {
    /// Создать `size` связанных конечных точек; i-я принадлежит рангу i
    pub fn new(size: usize) -> Vec<LocalEndpoint> {
        assert!(size > 0, "cluster needs at least one rank");
        let (senders, inboxes): (Vec<Sender<Envelope>>, Vec<Receiver<Envelope>>) =
            (0..size).map(|_| channel()).unzip();

        inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| LocalEndpoint {
                rank,
                size,
                // Без отправителя самому себе: иначе recv не узнает об отключении остальных
                peers: senders
                    .iter()
                    .enumerate()
                    .map(|(peer, tx)| if peer == rank { None } else { Some(tx.clone()) })
                    .collect(),
                inbox,
                round: 0,
                early: Vec::new(),
            })
            .collect()
    }
}

pub struct LocalEndpoint {
    rank: usize,
    size: usize,
    peers: Vec<Option<Sender<Envelope>>>,
    inbox: Receiver<Envelope>,
    /// Номер текущей коллективной операции
    round: u64,
    /// Сообщения следующих раундов, пришедшие раньше времени
    early: Vec<Envelope>,
}

impl LocalEndpoint {
    pub fn round(&self) -> u64 {
        self.round
    }
}

impl Communicator for LocalEndpoint {
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.size
    }

    fn all_to_all(&mut self, outgoing: Vec<Vec<u8>>) -> GridResult<Vec<Vec<u8>>> {
        assert_eq!(
            outgoing.len(),
            self.size,
            "all_to_all expects one buffer per rank"
        );
        let round = self.round;
        let mut incoming: Vec<Option<Vec<u8>>> = vec![None; self.size];

        for (dest, payload) in outgoing.into_iter().enumerate() {
            match &self.peers[dest] {
                None => incoming[dest] = Some(payload),
                Some(tx) => tx
                    .send(Envelope { source: self.rank, round, payload })
                    .map_err(|_| GridError::Disconnected(dest))?,
            }
        }

        let (current, later): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.early).into_iter().partition(|e| e.round == round);
        self.early = later;
        for envelope in current {
            incoming[envelope.source] = Some(envelope.payload);
        }

        while let Some(missing) = incoming.iter().position(|m| m.is_none()) {
            let envelope = self.inbox.recv().map_err(|_| GridError::Disconnected(missing))?;
            if envelope.round == round {
                incoming[envelope.source] = Some(envelope.payload);
            } else if envelope.round > round {
                self.early.push(envelope);
            } else {
                log::warn!(
                    "rank {}: dropping message from rank {} for finished round {}",
                    self.rank,
                    envelope.source,
                    envelope.round
                );
            }
        }

        self.round += 1;
        Ok(incoming.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn test_solo_echo() {
        let mut comm = SoloCommunicator;
        assert_eq!(comm.all_to_all(vec![vec![1, 2, 3]]).unwrap(), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn test_local_cluster_rounds() {
        let endpoints = LocalCluster::new(3);
        let handles: Vec<_> = endpoints
            .into_iter()
            .map(|mut comm| {
                thread::spawn(move || {
                    let mut results = Vec::new();
                    for round in 0..4u8 {
                        let rank = comm.rank() as u8;
                        let outgoing = (0..3u8).map(|dest| vec![rank, dest, round]).collect();
                        results.push(comm.all_to_all(outgoing).unwrap());
                    }
                    (comm.rank() as u8, results)
                })
            })
            .collect();

        for handle in handles {
            let (rank, results) = handle.join().unwrap();
            for (round, received) in results.into_iter().enumerate() {
                for (source, payload) in received.into_iter().enumerate() {
                    assert_eq!(payload, vec![source as u8, rank, round as u8]);
                }
            }
        }
    }

    #[test]
    fn test_disconnected_peer() {
        let mut endpoints = LocalCluster::new(2);
        let lonely = endpoints.pop();
        drop(endpoints);
        let mut lonely = lonely.unwrap();
        let result = lonely.all_to_all(vec![Vec::new(), Vec::new()]);
        assert!(matches!(result, Err(GridError::Disconnected(0))));
    }
}
