/// 경매 방 브로드캐스터
/// 경매 id와 구독 중인 연결 집합의 런타임 전용 연관. 서비스 시작 시 하나
/// 생성해 주입하며 전역 상태로 두지 않는다. 연결별 아웃바운드 큐는 유한하고,
/// 가득 찬 연결은 경고와 함께 이벤트를 버린다(브로드캐스터는 역압을 받지 않음).
/// 같은 경매의 이벤트 순서는 호출자(Resolver/Scheduler)의 임계 구역이 보장한다.
// region:    --- Imports
use crate::auction::events::ServerEvent;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, warn};
// endregion: --- Imports

// region:    --- Cluster Fan-Out

/// 프로세스 밖 팬아웃 확장점(멀티 노드 배포용)
/// 단일 프로세스 모델에서는 구현체를 제공하지 않는다.
#[async_trait]
pub trait ClusterFanOut: Send + Sync {
    async fn publish(&self, auction_id: i64, event: &ServerEvent) -> Result<(), String>;
}

// endregion: --- Cluster Fan-Out

// region:    --- Room Registry

pub struct RoomRegistry {
    rooms: Mutex<HashMap<i64, HashMap<u64, mpsc::Sender<ServerEvent>>>>,
    next_conn_id: AtomicU64,
    fanout: Option<Arc<dyn ClusterFanOut>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            next_conn_id: AtomicU64::new(1),
            fanout: None,
        }
    }

    /// 클러스터 팬아웃을 연결한 레지스트리 생성(확장점)
    pub fn with_fanout(fanout: Arc<dyn ClusterFanOut>) -> Self {
        Self {
            fanout: Some(fanout),
            ..Self::new()
        }
    }

    /// 연결 식별자 발급
    pub fn next_conn_id(&self) -> u64 {
        self.next_conn_id.fetch_add(1, Ordering::Relaxed)
    }

    /// 방 입장
    pub fn join(&self, auction_id: i64, conn_id: u64, sender: mpsc::Sender<ServerEvent>) {
        let mut rooms = self.rooms.lock().unwrap();
        rooms.entry(auction_id).or_default().insert(conn_id, sender);
        debug!(
            "{:<12} --> 방 입장: auction={} conn={}",
            "Rooms", auction_id, conn_id
        );
    }

    /// 방 퇴장(마지막 구독자가 나가면 방도 제거)
    pub fn leave(&self, auction_id: i64, conn_id: u64) {
        let mut rooms = self.rooms.lock().unwrap();
        if let Some(members) = rooms.get_mut(&auction_id) {
            members.remove(&conn_id);
            if members.is_empty() {
                rooms.remove(&auction_id);
            }
        }
    }

    /// 끊긴 연결을 모든 방에서 제거
    pub fn drop_connection(&self, conn_id: u64) {
        let mut rooms = self.rooms.lock().unwrap();
        rooms.retain(|_, members| {
            members.remove(&conn_id);
            !members.is_empty()
        });
    }

    /// 방 전체에 이벤트 전달
    /// Resolver/Scheduler가 경매별 임계 구역 안에서 호출하므로 같은 경매의
    /// 이벤트는 생산 순서 그대로 각 구독자 큐에 들어간다.
    pub fn publish(&self, auction_id: i64, event: &ServerEvent) {
        let mut rooms = self.rooms.lock().unwrap();
        if let Some(members) = rooms.get_mut(&auction_id) {
            let mut closed = Vec::new();
            for (conn_id, sender) in members.iter() {
                match sender.try_send(event.clone()) {
                    Ok(_) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        // 느린 연결: 역압 대신 이벤트를 버린다. 다음 이벤트가
                        // 전체 상태를 담고 있으므로 클라이언트는 자가 복구된다.
                        warn!(
                            "{:<12} --> 아웃바운드 큐 가득 참, 이벤트 폐기: auction={} conn={}",
                            "Rooms", auction_id, conn_id
                        );
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        closed.push(*conn_id);
                    }
                }
            }
            for conn_id in closed {
                members.remove(&conn_id);
            }
            if members.is_empty() {
                rooms.remove(&auction_id);
            }
        }
        drop(rooms);

        if let Some(fanout) = &self.fanout {
            let fanout = Arc::clone(fanout);
            let event = event.clone();
            tokio::spawn(async move {
                if let Err(e) = fanout.publish(auction_id, &event).await {
                    warn!("{:<12} --> 클러스터 팬아웃 실패: {}", "Rooms", e);
                }
            });
        }
    }

    /// 방 구독자 수
    pub fn member_count(&self, auction_id: i64) -> usize {
        self.rooms
            .lock()
            .unwrap()
            .get(&auction_id)
            .map(|m| m.len())
            .unwrap_or(0)
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// endregion: --- Room Registry

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn error_event() -> ServerEvent {
        ServerEvent::Error {
            code: "TEST".to_string(),
            message: "테스트".to_string(),
        }
    }

    /// 입장/퇴장과 빈 방 정리
    #[test]
    fn test_join_leave_gc() {
        let rooms = RoomRegistry::new();
        let (tx, _rx) = mpsc::channel(4);
        rooms.join(1, 10, tx);
        assert_eq!(rooms.member_count(1), 1);
        rooms.leave(1, 10);
        assert_eq!(rooms.member_count(1), 0);
    }

    /// 구독자 전원에게 전달되고, 끊긴 연결은 퇴출된다
    #[test]
    fn test_publish_and_evict_closed() {
        let rooms = RoomRegistry::new();
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, rx2) = mpsc::channel(4);
        rooms.join(1, 10, tx1);
        rooms.join(1, 20, tx2);
        drop(rx2); // 연결 종료

        rooms.publish(1, &error_event());
        assert!(rx1.try_recv().is_ok());
        assert_eq!(rooms.member_count(1), 1);
    }

    /// 큐가 가득 찬 연결은 이벤트를 잃지만 방에는 남는다
    #[test]
    fn test_full_queue_drops_event() {
        let rooms = RoomRegistry::new();
        let (tx, mut rx) = mpsc::channel(1);
        rooms.join(1, 10, tx);

        rooms.publish(1, &error_event());
        rooms.publish(1, &error_event()); // 폐기됨

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
        assert_eq!(rooms.member_count(1), 1);
    }

    /// 연결 종료 시 입장한 모든 방에서 제거된다
    #[test]
    fn test_drop_connection_everywhere() {
        let rooms = RoomRegistry::new();
        let (tx, _rx) = mpsc::channel(4);
        rooms.join(1, 10, tx.clone());
        rooms.join(2, 10, tx);
        rooms.drop_connection(10);
        assert_eq!(rooms.member_count(1), 0);
        assert_eq!(rooms.member_count(2), 0);
    }

    /// 클러스터 팬아웃 확장점이 로컬 전달과 함께 호출된다
    #[tokio::test]
    async fn test_cluster_fanout_receives_events() {
        struct RecordingFanOut {
            tx: mpsc::UnboundedSender<i64>,
        }

        #[async_trait]
        impl ClusterFanOut for RecordingFanOut {
            async fn publish(&self, auction_id: i64, _event: &ServerEvent) -> Result<(), String> {
                self.tx.send(auction_id).map_err(|e| e.to_string())
            }
        }

        let (ftx, mut frx) = mpsc::unbounded_channel();
        let rooms = RoomRegistry::with_fanout(Arc::new(RecordingFanOut { tx: ftx }));
        rooms.publish(7, &error_event());

        let got = tokio::time::timeout(std::time::Duration::from_secs(1), frx.recv())
            .await
            .expect("팬아웃 호출 대기 시간 초과");
        assert_eq!(got, Some(7));
    }
}
// endregion: --- Tests
