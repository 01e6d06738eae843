/// 경매 상태 조회(입찰 수 포함, 비공개 최저 가격은 내려주지 않는다)
pub const GET_AUCTION_STATE: &str = r#"
    SELECT a.id, a.product_id, a.starting_price, a.buy_now_price, a.current_bid,
           a.current_bidder_id, a.bid_increment, a.starts_at, a.ends_at, a.status,
           (SELECT COUNT(*) FROM bids b WHERE b.auction_id = a.id) AS bid_count
    FROM auctions a
    WHERE a.id = $1
"#;

/// 진행 중 경매 목록 조회
pub const GET_ACTIVE_AUCTIONS: &str = r#"
    SELECT a.id, a.product_id, a.starting_price, a.buy_now_price, a.current_bid,
           a.current_bidder_id, a.bid_increment, a.starts_at, a.ends_at, a.status,
           (SELECT COUNT(*) FROM bids b WHERE b.auction_id = a.id) AS bid_count
    FROM auctions a
    WHERE a.status = 'ACTIVE'
    ORDER BY a.ends_at
"#;

/// 입찰 이력 조회
pub const GET_BID_HISTORY: &str = r#"
    SELECT id, auction_id, bidder_id, amount, placed_at, is_winning
    FROM bids
    WHERE auction_id = $1
    ORDER BY placed_at DESC
"#;
