//! Action lists fed verbatim to each node's `action/actionlist.txt`.
//!
//! The client's automated mode understands, one command per line:
//!  - `SELFKEYREGISTER`: load the node's own keypair
//!  - `REGISTERPUBKEY`: register every key found under `pubkeys/`
//!  - `WATCH|<key>|<topic>`: subscribe to a topic
//!  - `SLEEP|<secs>`
//!  - `SEND|<from key>|<to peer>|<topic>|<message>`

/// Two-node chain, node1.
pub const TWO_NODE_NODE1: &str = "SELFKEYREGISTER
REGISTERPUBKEY
WATCH|SELF|D
SLEEP|10
SEND|SELF|node2|D|Hello, I am Node1.
SLEEP|10
";

/// Two-node chain, node2.
pub const TWO_NODE_NODE2: &str = "SELFKEYREGISTER
REGISTERPUBKEY
WATCH|SELF|D
SLEEP|3
SEND|SELF|node1|D|Hello, I am Node2.
SLEEP|20
";

/// Three-node chain, node1.
pub const THREE_NODE_NODE1: &str = "SELFKEYREGISTER
REGISTERPUBKEY
WATCH|SELF|D
SLEEP|10
SEND|SELF|node2|D|Hello, I am Node1.
SLEEP|10
";

/// Three-node chain, node2. Only listens.
pub const THREE_NODE_NODE2: &str = "SELFKEYREGISTER
REGISTERPUBKEY
WATCH|SELF|D
SLEEP|25
";

/// Three-node chain, node3. Sends without watching the topic itself.
pub const THREE_NODE_NODE3: &str = "SELFKEYREGISTER
REGISTERPUBKEY
SLEEP|3
SEND|SELF|node1|D|Hello, I am Node3.
SLEEP|20
";
