// src/core/commands/rules.rs

//! Static command rules: which commands the proxy accepts, their arity bounds, and the
//! commands that are always refused.
//!
//! Arity bounds count the command name itself. `None` as the upper bound means unbounded.

/// `(name, min_args, max_args)` for every command the proxy will route.
pub(crate) const COMMAND_RULES: &[(&str, usize, Option<usize>)] = &[
    // proxy administration
    ("PROXY", 2, Some(5)),
    // keys
    ("DEL", 2, Some(2001)),
    ("TYPE", 2, Some(2)),
    ("EXISTS", 2, Some(2)),
    ("EXPIRE", 3, Some(3)),
    ("EXPIREAT", 3, Some(3)),
    ("TTL", 2, Some(2)),
    ("PTTL", 2, Some(2)),
    ("PERSIST", 2, Some(2)),
    ("PEXPIRE", 3, Some(3)),
    ("PEXPIREAT", 3, Some(3)),
    ("RENAME", 3, Some(3)),
    ("RENAMENX", 3, Some(3)),
    ("DUMP", 2, Some(2)),
    ("RESTORE", 4, Some(4)),
    // bits
    ("SETBIT", 4, Some(4)),
    ("BITCOUNT", 2, Some(2)),
    ("GETBIT", 3, Some(3)),
    // strings
    ("GET", 2, Some(2)),
    ("MGET", 2, Some(2001)),
    ("GETRANGE", 4, Some(4)),
    ("GETSET", 3, Some(3)),
    ("SET", 3, Some(6)),
    ("MSET", 3, Some(4001)),
    ("SETEX", 4, Some(4)),
    ("SETNX", 3, Some(3)),
    ("PSETEX", 4, Some(4)),
    ("SETRANGE", 4, Some(4)),
    ("STRLEN", 2, Some(2)),
    ("INCR", 2, Some(2)),
    ("DECR", 2, Some(2)),
    ("INCRBY", 3, Some(3)),
    ("DECRBY", 3, Some(3)),
    ("INCRBYFLOAT", 3, Some(3)),
    ("APPEND", 3, Some(3)),
    // hashes
    ("HGET", 3, Some(3)),
    ("HSET", 4, Some(4)),
    ("HMGET", 3, None),
    ("HMSET", 4, None),
    ("HGETALL", 2, Some(2)),
    ("HLEN", 2, Some(2)),
    ("HDEL", 3, None),
    ("HEXISTS", 3, Some(3)),
    ("HINCRBY", 4, Some(4)),
    ("HINCRBYFLOAT", 4, Some(4)),
    ("HKEYS", 2, Some(2)),
    ("HSETNX", 4, Some(4)),
    ("HVALS", 2, Some(2)),
    // sets
    ("SADD", 3, None),
    ("SCARD", 2, Some(2)),
    ("SISMEMBER", 3, Some(3)),
    ("SMEMBERS", 2, Some(2)),
    ("SREM", 3, None),
    ("SPOP", 2, Some(2)),
    ("SRANDMEMBER", 2, Some(3)),
    // lists
    ("LPUSH", 3, None),
    ("RPUSH", 3, None),
    ("LPOP", 2, Some(2)),
    ("RPOP", 2, Some(2)),
    ("LINDEX", 3, Some(3)),
    ("LINSERT", 5, Some(5)),
    ("LTRIM", 4, Some(4)),
    ("LRANGE", 4, Some(4)),
    ("LLEN", 2, Some(2)),
    ("LPUSHX", 3, Some(3)),
    ("RPUSHX", 3, Some(3)),
    ("LSET", 4, Some(4)),
    ("LREM", 4, Some(4)),
    // sorted sets
    ("ZADD", 4, None),
    ("ZCARD", 2, Some(2)),
    ("ZCOUNT", 4, Some(4)),
    ("ZRANK", 3, Some(3)),
    ("ZREVRANK", 3, Some(3)),
    ("ZRANGE", 4, Some(5)),
    ("ZREVRANGE", 4, Some(5)),
    ("ZRANGEBYSCORE", 4, None),
    ("ZREVRANGEBYSCORE", 4, None),
    ("ZREM", 3, None),
    ("ZREMRANGEBYRANK", 4, Some(4)),
    ("ZREMRANGEBYSCORE", 4, Some(4)),
    ("ZINCRBY", 4, Some(4)),
    ("ZSCORE", 3, Some(3)),
    ("ZRANGEBYLEX", 4, Some(7)),
    ("ZLEXCOUNT", 4, Some(4)),
    ("ZREMRANGEBYLEX", 4, Some(4)),
    // finite sorted sets, served by the cluster's own module
    ("XADD", 4, None),
    ("XINCRBY", 4, Some(9)),
    ("XRANGE", 4, Some(5)),
    ("XREVRANGE", 4, Some(5)),
    ("XSCORE", 3, Some(3)),
    ("XREM", 3, None),
    ("XCARD", 2, Some(2)),
    ("XSETOPTIONS", 3, Some(7)),
    ("XGETFINITY", 2, Some(2)),
    ("XGETPRUNING", 2, Some(2)),
];

/// Commands that are refused regardless of their arguments.
pub(crate) const FORBIDDEN_COMMANDS: &[&str] = &[
    "BGREWRITEAOF",
    "BGSAVE",
    "BITOP",
    "BLPOP",
    "BRPOP",
    "BRPOPLPUSH",
    "CLIENT",
    "CONFIG",
    "DBSIZE",
    "DEBUG",
    "DISCARD",
    "EXEC",
    "FLUSHALL",
    "FLUSHDB",
    "KEYS",
    "LASTSAVE",
    "MONITOR",
    "MOVE",
    "MSETNX",
    "MULTI",
    "OBJECT",
    "PSUBSCRIBE",
    "PUBLISH",
    "PUNSUBSCRIBE",
    "RANDOMKEY",
    "RENAME",
    "RENAMENX",
    "SAVE",
    "SCAN",
    "SSCAN",
    "HSCAN",
    "ZSCAN",
    "SCRIPT",
    "SHUTDOWN",
    "SLAVEOF",
    "SLOWLOG",
    "SORT",
    "SUBSCRIBE",
    "SYNC",
    "SDIFF",
    "SDIFFSTORE",
    "SINTER",
    "SINTERSTORE",
    "SMOVE",
    "SUNION",
    "SUNIONSTORE",
    "TIME",
    "UNSUBSCRIBE",
    "UNWATCH",
    "WATCH",
    "ZUNIONSTORE",
    "ZINTERSTORE",
];

/// Commands that never modify data. With `slave_ok` enabled these may be served by a replica.
pub(crate) const READONLY_COMMANDS: &[&str] = &[
    "TYPE",
    "EXISTS",
    "TTL",
    "PTTL",
    "DUMP",
    "BITCOUNT",
    "GETBIT",
    "GET",
    "MGET",
    "GETRANGE",
    "STRLEN",
    "HGET",
    "HMGET",
    "HGETALL",
    "HLEN",
    "HEXISTS",
    "HKEYS",
    "HVALS",
    "SCARD",
    "SISMEMBER",
    "SMEMBERS",
    "SRANDMEMBER",
    "LINDEX",
    "LRANGE",
    "LLEN",
    "ZCARD",
    "ZCOUNT",
    "ZRANK",
    "ZREVRANK",
    "ZRANGE",
    "ZREVRANGE",
    "ZRANGEBYSCORE",
    "ZREVRANGEBYSCORE",
    "ZSCORE",
    "ZRANGEBYLEX",
    "ZLEXCOUNT",
    "XRANGE",
    "XREVRANGE",
    "XSCORE",
    "XCARD",
    "XGETFINITY",
    "XGETPRUNING",
];
