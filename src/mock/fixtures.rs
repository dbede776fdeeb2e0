//! Seed data for the in-memory backend.

use chrono::{DateTime, Duration, Utc};

use crate::api::models::{Tweet, UserProfile};

/// A tweet as stored by the backend; the author is joined in on read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredTweet {
    pub id: u64,
    pub text: String,
    pub author_id: u64,
    pub created_at: DateTime<Utc>,
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
}

impl StoredTweet {
    /// Renders the tweet with its author embedded.
    pub fn render(&self, users: &[UserProfile]) -> Tweet {
        Tweet {
            id: self.id,
            text: self.text.clone(),
            author: users.iter().find(|u| u.id == self.author_id).cloned(),
            author_id: Some(self.author_id),
            created_at: self.created_at,
            likes: self.likes,
            retweets: self.retweets,
            replies: self.replies,
        }
    }
}

/// Builds the avatar URL for a display name.
pub fn avatar_for(name: &str, background: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&background={background}&color=fff",
        name.replace(' ', "+")
    )
}

fn user(
    id: u64,
    name: &str,
    username: &str,
    email: &str,
    background: &str,
    counts: (u64, u64),
    joined: &str,
) -> UserProfile {
    UserProfile {
        id,
        name: name.to_string(),
        username: username.to_string(),
        email: email.to_string(),
        avatar: Some(avatar_for(name, background)),
        followers: counts.0,
        following: counts.1,
        joined: Some(joined.to_string()),
    }
}

/// The seeded accounts.
pub fn seed_users() -> Vec<UserProfile> {
    vec![
        user(
            1,
            "John Doe",
            "johndoe",
            "john@example.com",
            "1DA1F2",
            (156, 89),
            "2021-01-15T00:00:00Z",
        ),
        user(
            2,
            "Demo User",
            "demouser",
            "demo@twitter.com",
            "E1306C",
            (1000, 500),
            "2020-12-01T00:00:00Z",
        ),
        user(
            3,
            "Jane Smith",
            "janesmith",
            "jane@example.com",
            "17BF63",
            (234, 123),
            "2021-03-22T00:00:00Z",
        ),
    ]
}

/// The seeded tweets, newest first, timed relative to `now`.
pub fn seed_tweets(now: DateTime<Utc>) -> Vec<StoredTweet> {
    let seeds: [(&str, u64, i64, (u64, u64, u64)); 5] = [
        (
            "Just connected to Apiman! API management has never been easier 🚀 #Apiman #API",
            1,
            2,
            (23, 5, 3),
        ),
        (
            "The API Gateway integration is working perfectly! Rate limiting and authentication all set up ✅",
            2,
            4,
            (45, 12, 8),
        ),
        (
            "Authentication with JWT tokens and refresh token rotation is now implemented. Security first! 🔐",
            2,
            6,
            (67, 23, 15),
        ),
        (
            "The responsive design looks great on mobile devices! 📱 Testing on different screen sizes.",
            1,
            8,
            (34, 7, 4),
        ),
        (
            "Real-time features coming soon! WebSocket integration for live updates 🔄",
            3,
            12,
            (89, 34, 21),
        ),
    ];

    seeds
        .iter()
        .zip(1u64..)
        .map(|((text, author_id, hours_ago, (likes, retweets, replies)), id)| StoredTweet {
            id,
            text: (*text).to_string(),
            author_id: *author_id,
            created_at: now - Duration::hours(*hours_ago),
            likes: *likes,
            retweets: *retweets,
            replies: *replies,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_account_is_seeded() {
        let users = seed_users();
        let demo = users.iter().find(|u| u.email == "demo@twitter.com").unwrap();
        assert_eq!(demo.username, "demouser");
        assert_eq!(demo.name, "Demo User");
    }

    #[test]
    fn test_seed_tweets_are_newest_first_with_known_authors() {
        let users = seed_users();
        let tweets = seed_tweets(Utc::now());

        assert!(tweets.windows(2).all(|w| w[0].created_at > w[1].created_at));
        for tweet in &tweets {
            assert!(tweet.render(&users).author.is_some());
        }
    }

    #[test]
    fn test_avatar_for_encodes_spaces() {
        assert_eq!(
            avatar_for("Demo User", "E1306C"),
            "https://ui-avatars.com/api/?name=Demo+User&background=E1306C&color=fff"
        );
    }
}
